//! Local SQLite store of joints, outputs and the wallet's own addresses
//!
//! Only the slice of the ledger the commands need is kept: units authored by
//! or paying to our addresses, their data payloads, the outputs we can spend
//! and the single wallet registered from the key file.

use crate::domain::{DomainError, DomainResult, Joint, Output, WalletPath};
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

pub type DbPool = Pool<Sqlite>;

/// One stored data attachment
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DataRecord {
    pub unit: String,
    pub payload: Option<String>,
}

/// An unspent output of one of our addresses
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SpendableOutput {
    pub unit: String,
    pub message_index: i64,
    pub output_index: i64,
    pub amount: i64,
}

impl SpendableOutput {
    pub fn amount(&self) -> u64 {
        u64::try_from(self.amount).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct WalletRecord {
    pub wallet: String,
    pub xpub: String,
    pub device_address: String,
}

/// An address of the wallet with the indexes it was derived at
#[derive(Debug, Clone, PartialEq)]
pub struct AddressRecord {
    pub address: String,
    pub path: WalletPath,
    pub definition: Value,
}

/// Derivation indexes of the key that signs for an address
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct SigningRecord {
    pub wallet: String,
    pub account: i64,
    pub is_change: bool,
    pub address_index: i64,
}

impl SigningRecord {
    pub fn path(&self) -> WalletPath {
        WalletPath::new(
            self.account as u32,
            u32::from(self.is_change),
            self.address_index as u32,
        )
    }
}

/// Open (creating when missing) the store file and run migrations
pub async fn connect(path: &Path) -> DomainResult<DbPool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    info!("Database connected: {}", path.display());

    init_db(&pool).await?;
    Ok(pool)
}

/// Stored units and their payloads
pub struct JointRepo;

impl JointRepo {
    /// Store a joint; returns false when the unit was already known
    pub async fn save(pool: &DbPool, joint: &Joint) -> DomainResult<bool> {
        let unit = &joint.unit;
        let unit_hash = joint.unit_hash()?;
        let json = serde_json::to_string(joint)?;

        let mut tx = pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO units (unit, version, alt, headers_commission, payload_commission, json, creation_date)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(unit_hash)
        .bind(&unit.version)
        .bind(&unit.alt)
        .bind(unit.headers_commission.map(|c| c as i64))
        .bind(unit.payload_commission.map(|c| c as i64))
        .bind(&json)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.commit().await?;
            debug!("Unit {} already stored", unit_hash);
            return Ok(false);
        }

        for author in &unit.authors {
            let definition = author
                .definition
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            sqlx::query("INSERT OR IGNORE INTO unit_authors (unit, address, definition) VALUES (?, ?, ?)")
                .bind(unit_hash)
                .bind(&author.address)
                .bind(definition)
                .execute(&mut *tx)
                .await?;
        }

        for (message_index, message) in unit.messages.iter().enumerate() {
            let payload = message.payload.as_ref().map(serde_json::to_string).transpose()?;
            sqlx::query(
                r#"
                INSERT INTO messages (unit, message_index, app, payload_location, payload_hash, payload)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(unit_hash)
            .bind(message_index as i64)
            .bind(&message.app)
            .bind(&message.payload_location)
            .bind(&message.payload_hash)
            .bind(payload)
            .execute(&mut *tx)
            .await?;

            if !message.is_payment() || message.payload.is_none() {
                continue;
            }
            let payment = message.payment_payload()?;
            if payment.asset.is_some() {
                continue;
            }

            for (output_index, Output { address, amount }) in payment.outputs.iter().enumerate() {
                let amount = i64::try_from(*amount).map_err(|_| {
                    DomainError::payload(format!("output amount {} out of range", amount))
                })?;
                sqlx::query(
                    r#"
                    INSERT INTO outputs (unit, message_index, output_index, address, amount)
                    VALUES (?, ?, ?, ?, ?)
                    "#,
                )
                .bind(unit_hash)
                .bind(message_index as i64)
                .bind(output_index as i64)
                .bind(address)
                .bind(amount)
                .execute(&mut *tx)
                .await?;
            }

            // spends are kept apart from outputs so the funding unit may arrive later
            for (input_index, input) in payment.inputs.iter().enumerate() {
                let (Some(src_unit), Some(src_message), Some(src_output)) =
                    (&input.unit, input.message_index, input.output_index)
                else {
                    continue;
                };
                sqlx::query(
                    r#"
                    INSERT OR IGNORE INTO inputs
                        (unit, message_index, input_index, src_unit, src_message_index, src_output_index)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(unit_hash)
                .bind(message_index as i64)
                .bind(input_index as i64)
                .bind(src_unit)
                .bind(i64::from(src_message))
                .bind(i64::from(src_output))
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        info!("Saved unit {}", unit_hash);
        Ok(true)
    }

    /// Every data attachment, in the order it was stored
    pub async fn list_data_messages(pool: &DbPool) -> DomainResult<Vec<DataRecord>> {
        let records = sqlx::query_as::<_, DataRecord>(
            "SELECT unit, payload FROM messages WHERE app = 'data' ORDER BY rowid",
        )
        .fetch_all(pool)
        .await?;

        Ok(records)
    }

    /// Unspent base-asset outputs of an address, oldest first
    pub async fn spendable_outputs(pool: &DbPool, address: &str) -> DomainResult<Vec<SpendableOutput>> {
        let outputs = sqlx::query_as::<_, SpendableOutput>(
            r#"
            SELECT unit, message_index, output_index, amount
            FROM outputs
            WHERE address = ?
              AND NOT EXISTS (
                SELECT 1 FROM inputs
                WHERE inputs.src_unit = outputs.unit
                  AND inputs.src_message_index = outputs.message_index
                  AND inputs.src_output_index = outputs.output_index
              )
            ORDER BY outputs.rowid
            "#,
        )
        .bind(address)
        .fetch_all(pool)
        .await?;

        Ok(outputs)
    }

    /// Whether the address has authored any stored unit (and so revealed its definition)
    pub async fn has_authored(pool: &DbPool, address: &str) -> DomainResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM unit_authors WHERE address = ? LIMIT 1")
                .bind(address)
                .fetch_optional(pool)
                .await?;

        Ok(found.is_some())
    }
}

/// The wallet derived from the key file and its addresses
pub struct WalletRepo;

impl WalletRepo {
    /// The only wallet of this store, if any
    pub async fn single_wallet(pool: &DbPool) -> DomainResult<Option<WalletRecord>> {
        let mut wallets = sqlx::query_as::<_, WalletRecord>(
            "SELECT wallet, xpub, device_address FROM wallets",
        )
        .fetch_all(pool)
        .await?;

        match wallets.len() {
            0 => Ok(None),
            1 => Ok(wallets.pop()),
            n => Err(DomainError::Wallet(format!("{} wallets found, expected one", n))),
        }
    }

    /// Register a wallet with its first address and signing path
    pub async fn register(
        pool: &DbPool,
        wallet: &WalletRecord,
        address: &AddressRecord,
        signing_path: &str,
    ) -> DomainResult<()> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO wallets (wallet, xpub, device_address, creation_date) VALUES (?, ?, ?, ?)",
        )
        .bind(&wallet.wallet)
        .bind(&wallet.xpub)
        .bind(&wallet.device_address)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO wallet_signing_paths (wallet, signing_path, device_address) VALUES (?, ?, ?)",
        )
        .bind(&wallet.wallet)
        .bind(signing_path)
        .bind(&wallet.device_address)
        .execute(&mut *tx)
        .await?;

        Self::insert_address(&mut tx, &wallet.wallet, address).await?;

        tx.commit().await?;
        info!("Registered wallet {} with address {}", wallet.wallet, address.address);
        Ok(())
    }

    async fn insert_address(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        wallet: &str,
        record: &AddressRecord,
    ) -> DomainResult<()> {
        sqlx::query(
            r#"
            INSERT INTO my_addresses (address, wallet, account, is_change, address_index, definition, creation_date)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.address)
        .bind(wallet)
        .bind(record.path.account as i64)
        .bind(record.path.is_change != 0)
        .bind(record.path.address_index as i64)
        .bind(serde_json::to_string(&record.definition)?)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn addresses(pool: &DbPool) -> DomainResult<Vec<String>> {
        let addresses: Vec<String> = sqlx::query_scalar(
            "SELECT address FROM my_addresses ORDER BY account, is_change, address_index",
        )
        .fetch_all(pool)
        .await?;

        Ok(addresses)
    }

    /// Definition of one of our addresses
    pub async fn read_definition(pool: &DbPool, address: &str) -> DomainResult<Value> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT definition FROM my_addresses WHERE address = ?")
                .bind(address)
                .fetch_all(pool)
                .await?;

        match rows.as_slice() {
            [definition] => Ok(serde_json::from_str(definition)?),
            _ => Err(DomainError::DefinitionNotFound(address.to_string())),
        }
    }

    /// Derivation indexes of the key signing for `address` on `signing_path`
    pub async fn read_signing_record(
        pool: &DbPool,
        address: &str,
        signing_path: &str,
    ) -> DomainResult<SigningRecord> {
        let mut rows = sqlx::query_as::<_, SigningRecord>(
            r#"
            SELECT my_addresses.wallet, account, is_change, address_index
            FROM my_addresses
            JOIN wallet_signing_paths USING (wallet)
            WHERE address = ? AND signing_path = ?
            "#,
        )
        .bind(address)
        .bind(signing_path)
        .fetch_all(pool)
        .await?;

        if rows.len() != 1 {
            return Err(DomainError::KeyRecordNotFound {
                address: address.to_string(),
                signing_path: signing_path.to_string(),
                count: rows.len(),
            });
        }
        rows.pop().ok_or_else(|| DomainError::DefinitionNotFound(address.to_string()))
    }
}

/// The witness list used when composing units
pub struct WitnessRepo;

impl WitnessRepo {
    pub async fn get(pool: &DbPool) -> DomainResult<Vec<String>> {
        let witnesses: Vec<String> = sqlx::query_scalar("SELECT address FROM my_witnesses ORDER BY address")
            .fetch_all(pool)
            .await?;

        Ok(witnesses)
    }

    /// Replace the stored witness list
    pub async fn set(pool: &DbPool, witnesses: &[String]) -> DomainResult<()> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM my_witnesses").execute(&mut *tx).await?;
        for address in witnesses {
            sqlx::query("INSERT OR IGNORE INTO my_witnesses (address) VALUES (?)")
                .bind(address)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
pub async fn setup_test_db() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    init_db(&pool).await.expect("Failed to init database");
    pool
}

/// Initialize database with migrations
pub async fn init_db(pool: &DbPool) -> DomainResult<()> {
    debug!("Running database migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS units (
            unit TEXT PRIMARY KEY NOT NULL,
            version TEXT NOT NULL,
            alt TEXT NOT NULL,
            headers_commission INTEGER,
            payload_commission INTEGER,
            json TEXT NOT NULL,
            creation_date DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS unit_authors (
            unit TEXT NOT NULL,
            address TEXT NOT NULL,
            definition TEXT,
            PRIMARY KEY (unit, address)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS by_author_address ON unit_authors(address)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            unit TEXT NOT NULL,
            message_index INTEGER NOT NULL,
            app TEXT NOT NULL,
            payload_location TEXT NOT NULL,
            payload_hash TEXT NOT NULL,
            payload TEXT,
            PRIMARY KEY (unit, message_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS outputs (
            unit TEXT NOT NULL,
            message_index INTEGER NOT NULL,
            output_index INTEGER NOT NULL,
            address TEXT NOT NULL,
            amount INTEGER NOT NULL,
            PRIMARY KEY (unit, message_index, output_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS outputs_by_address ON outputs(address)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inputs (
            unit TEXT NOT NULL,
            message_index INTEGER NOT NULL,
            input_index INTEGER NOT NULL,
            src_unit TEXT NOT NULL,
            src_message_index INTEGER NOT NULL,
            src_output_index INTEGER NOT NULL,
            PRIMARY KEY (unit, message_index, input_index),
            UNIQUE (src_unit, src_message_index, src_output_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wallets (
            wallet TEXT PRIMARY KEY NOT NULL,
            xpub TEXT NOT NULL,
            device_address TEXT NOT NULL,
            creation_date DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wallet_signing_paths (
            wallet TEXT NOT NULL,
            signing_path TEXT NOT NULL,
            device_address TEXT NOT NULL,
            PRIMARY KEY (wallet, signing_path)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS my_addresses (
            address TEXT PRIMARY KEY NOT NULL,
            wallet TEXT NOT NULL,
            account INTEGER NOT NULL,
            is_change BOOLEAN NOT NULL,
            address_index INTEGER NOT NULL,
            definition TEXT NOT NULL,
            creation_date DATETIME NOT NULL,
            UNIQUE (wallet, is_change, address_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS my_witnesses (
            address TEXT PRIMARY KEY NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    debug!("Database migrations complete");
    Ok(())
}
