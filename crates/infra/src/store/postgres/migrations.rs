//! Schema applied at startup. Every statement is idempotent.

pub(super) const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id         UUID PRIMARY KEY,
        login      VARCHAR(255) UNIQUE NOT NULL,
        password   VARCHAR(255) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS balances (
        user_id   UUID PRIMARY KEY REFERENCES users(id),
        current   NUMERIC(15, 2) NOT NULL DEFAULT 0 CHECK (current >= 0),
        withdrawn NUMERIC(15, 2) NOT NULL DEFAULT 0 CHECK (withdrawn >= 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id          UUID PRIMARY KEY,
        user_id     UUID NOT NULL REFERENCES users(id),
        number      VARCHAR(255) UNIQUE NOT NULL,
        status      VARCHAR(50) NOT NULL DEFAULT 'NEW',
        accrual     NUMERIC(15, 2),
        uploaded_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_orders_user_id ON orders(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status)",
    r#"
    CREATE TABLE IF NOT EXISTS withdrawals (
        id           UUID PRIMARY KEY,
        user_id      UUID NOT NULL REFERENCES users(id),
        order_number VARCHAR(255) NOT NULL,
        sum          NUMERIC(15, 2) NOT NULL,
        processed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_withdrawals_user_id ON withdrawals(user_id)",
];
