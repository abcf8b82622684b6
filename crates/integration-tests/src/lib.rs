// Postgres-backed store and orchestrator tests live in tests/.
