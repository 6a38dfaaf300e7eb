use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::pool::PoolConnection;
use sqlx::{query, query_as, query_scalar};
use tracing::{error, info};

#[cfg(feature = "sqlite")]
use sqlx::{Sqlite, SqlitePool};

#[cfg(feature = "postgres")]
use sqlx::{PgPool, Postgres};

use crate::config::{get_config, DatabaseConfig};
use crate::errors::{InsuranceError, InsuranceResult};
use crate::server::models::{
    Car, CarWithOwner, Claim, ClaimRow, InsurancePolicy, NewClaim, NewPolicy, Owner,
};

#[cfg(feature = "sqlite")]
const SQLITE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS owners (
        id      INTEGER PRIMARY KEY AUTOINCREMENT,
        name    TEXT NOT NULL,
        email   TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cars (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        vin                 TEXT NOT NULL UNIQUE,
        make                TEXT,
        model               TEXT,
        year_of_manufacture INTEGER NOT NULL,
        owner_id            INTEGER NOT NULL REFERENCES owners(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS policies (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        car_id      INTEGER NOT NULL REFERENCES cars(id),
        provider    TEXT NOT NULL,
        start_date  TEXT NOT NULL,
        end_date    TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS claims (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        car_id      INTEGER NOT NULL REFERENCES cars(id),
        claim_date  TEXT NOT NULL,
        description TEXT,
        amount      TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_policies_end_date ON policies(end_date)",
];

#[cfg(feature = "postgres")]
const POSTGRES_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS owners (
        id      BIGSERIAL PRIMARY KEY,
        name    TEXT NOT NULL,
        email   TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cars (
        id                  BIGSERIAL PRIMARY KEY,
        vin                 TEXT NOT NULL UNIQUE,
        make                TEXT,
        model               TEXT,
        year_of_manufacture INTEGER NOT NULL,
        owner_id            BIGINT NOT NULL REFERENCES owners(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS policies (
        id          BIGSERIAL PRIMARY KEY,
        car_id      BIGINT NOT NULL REFERENCES cars(id),
        provider    TEXT NOT NULL,
        start_date  DATE NOT NULL,
        end_date    DATE NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS claims (
        id          BIGSERIAL PRIMARY KEY,
        car_id      BIGINT NOT NULL REFERENCES cars(id),
        claim_date  DATE NOT NULL,
        description TEXT,
        amount      NUMERIC NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_policies_end_date ON policies(end_date)",
];

#[cfg(feature = "sqlite")]
const SQLITE_POLICIES_ENDING_ON_OR_BEFORE: &str = "SELECT id, car_id, provider, start_date, end_date \
     FROM policies WHERE end_date <= ? ORDER BY id";

#[cfg(feature = "postgres")]
const POSTGRES_POLICIES_ENDING_ON_OR_BEFORE: &str = "SELECT id, car_id, provider, start_date, end_date \
     FROM policies WHERE end_date <= $1 ORDER BY id";

/// Log a failed query and map it into the crate error type.
fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> InsuranceError {
    move |e| {
        error!("{operation} failed: {e}");
        InsuranceError::DatabaseError(e.to_string())
    }
}

/// Unified database abstraction over SQLite and Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

/// A single pooled connection checked out for one unit of work.
///
/// The connection goes back to the pool when the scope is dropped, whichever
/// way the unit of work ends.
#[derive(Debug)]
pub enum DbScope {
    #[cfg(feature = "sqlite")]
    SQLite(PoolConnection<Sqlite>),
    #[cfg(feature = "postgres")]
    Postgres(PoolConnection<Postgres>),
}

impl Database {
    /// Initialize the database connection from the global configuration.
    pub async fn new() -> InsuranceResult<Arc<Self>> {
        let config = get_config()?;
        Ok(Arc::new(Self::connect(&config.database).await?))
    }

    /// Connect using an explicit database configuration.
    pub async fn connect(db_config: &DatabaseConfig) -> InsuranceResult<Self> {
        match db_config.db_type.as_str() {
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let pool = SqlitePool::connect(&db_config.sqlite_url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to SQLite: {e}");
                        InsuranceError::DatabaseError(format!("failed to connect to SQLite: {e}"))
                    })?;

                Ok(Database::SQLite(pool))
            }
            #[cfg(not(feature = "sqlite"))]
            "sqlite" => Err(InsuranceError::ConfigError(
                "SQLite support not compiled in. Enable the 'sqlite' feature.".to_string(),
            )),
            #[cfg(feature = "postgres")]
            "postgres" => {
                let pool = PgPool::connect(&db_config.postgres_url)
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to PostgreSQL: {e}");
                        InsuranceError::DatabaseError(format!(
                            "failed to connect to PostgreSQL: {e}"
                        ))
                    })?;

                Ok(Database::Postgres(pool))
            }
            #[cfg(not(feature = "postgres"))]
            "postgres" => Err(InsuranceError::ConfigError(
                "PostgreSQL support not compiled in. Enable the 'postgres' feature.".to_string(),
            )),
            other => Err(InsuranceError::ConfigError(format!(
                "unsupported database type: {other}"
            ))),
        }
    }

    /// Backend name, as used in configuration.
    pub fn db_type(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "postgres",
        }
    }

    /// Create the tables if they do not exist yet.
    pub async fn init_schema(&self) -> InsuranceResult<()> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                for statement in SQLITE_SCHEMA {
                    query(*statement)
                        .execute(pool)
                        .await
                        .map_err(db_error("SQLite init_schema"))?;
                }
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                for statement in POSTGRES_SCHEMA {
                    query(*statement)
                        .execute(pool)
                        .await
                        .map_err(db_error("Postgres init_schema"))?;
                }
            }
        }

        Ok(())
    }

    /// Round-trip a trivial query to check connectivity.
    pub async fn ping(&self) -> bool {
        let result = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query("SELECT 1").execute(pool).await,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query("SELECT 1").execute(pool).await,
        };

        result.is_ok()
    }

    /// Check a connection out of the pool for one unit of work.
    pub async fn acquire(&self) -> InsuranceResult<DbScope> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => Ok(DbScope::SQLite(
                pool.acquire().await.map_err(db_error("SQLite acquire"))?,
            )),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => Ok(DbScope::Postgres(
                pool.acquire().await.map_err(db_error("Postgres acquire"))?,
            )),
        }
    }

    /// Insert an owner and return it with its assigned id.
    pub async fn insert_owner(&self, name: &str, email: Option<&str>) -> InsuranceResult<Owner> {
        let id: i64 = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => {
                query_scalar("INSERT INTO owners (name, email) VALUES (?, ?) RETURNING id")
                    .bind(name)
                    .bind(email)
                    .fetch_one(pool)
                    .await
                    .map_err(db_error("SQLite insert_owner"))?
            }
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => {
                query_scalar("INSERT INTO owners (name, email) VALUES ($1, $2) RETURNING id")
                    .bind(name)
                    .bind(email)
                    .fetch_one(pool)
                    .await
                    .map_err(db_error("Postgres insert_owner"))?
            }
        };

        Ok(Owner {
            id,
            name: name.to_string(),
            email: email.map(String::from),
        })
    }

    /// Insert a car. The `id` field of `car` is ignored; the stored car is returned.
    pub async fn insert_car(&self, car: Car) -> InsuranceResult<Car> {
        let id: i64 = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_scalar(
                r#"
                INSERT INTO cars (vin, make, model, year_of_manufacture, owner_id)
                VALUES (?, ?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(&car.vin)
            .bind(&car.make)
            .bind(&car.model)
            .bind(car.year_of_manufacture)
            .bind(car.owner_id)
            .fetch_one(pool)
            .await
            .map_err(db_error("SQLite insert_car"))?,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_scalar(
                r#"
                INSERT INTO cars (vin, make, model, year_of_manufacture, owner_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(&car.vin)
            .bind(&car.make)
            .bind(&car.model)
            .bind(car.year_of_manufacture)
            .bind(car.owner_id)
            .fetch_one(pool)
            .await
            .map_err(db_error("Postgres insert_car"))?,
        };

        Ok(Car { id, ..car })
    }

    /// Insert a policy.
    ///
    /// Returns `InvalidArgument` without touching the store when the start date
    /// is after the end date.
    pub async fn insert_policy(&self, policy: NewPolicy) -> InsuranceResult<InsurancePolicy> {
        if policy.start_date > policy.end_date {
            return Err(InsuranceError::InvalidArgument(format!(
                "policy start date {} is after end date {}",
                policy.start_date, policy.end_date
            )));
        }

        let id: i64 = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_scalar(
                r#"
                INSERT INTO policies (car_id, provider, start_date, end_date)
                VALUES (?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(policy.car_id)
            .bind(&policy.provider)
            .bind(policy.start_date)
            .bind(policy.end_date)
            .fetch_one(pool)
            .await
            .map_err(db_error("SQLite insert_policy"))?,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_scalar(
                r#"
                INSERT INTO policies (car_id, provider, start_date, end_date)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(policy.car_id)
            .bind(&policy.provider)
            .bind(policy.start_date)
            .bind(policy.end_date)
            .fetch_one(pool)
            .await
            .map_err(db_error("Postgres insert_policy"))?,
        };

        Ok(InsurancePolicy {
            id,
            car_id: policy.car_id,
            provider: policy.provider,
            start_date: policy.start_date,
            end_date: policy.end_date,
        })
    }

    /// Insert a claim and return it with its assigned id.
    pub async fn insert_claim(&self, claim: NewClaim) -> InsuranceResult<Claim> {
        let amount = claim.amount.to_string();

        let id: i64 = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_scalar(
                r#"
                INSERT INTO claims (car_id, claim_date, description, amount)
                VALUES (?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(claim.car_id)
            .bind(claim.claim_date)
            .bind(&claim.description)
            .bind(&amount)
            .fetch_one(pool)
            .await
            .map_err(db_error("SQLite insert_claim"))?,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_scalar(
                r#"
                INSERT INTO claims (car_id, claim_date, description, amount)
                VALUES ($1, $2, $3, $4::NUMERIC)
                RETURNING id
                "#,
            )
            .bind(claim.car_id)
            .bind(claim.claim_date)
            .bind(&claim.description)
            .bind(&amount)
            .fetch_one(pool)
            .await
            .map_err(db_error("Postgres insert_claim"))?,
        };

        Ok(Claim {
            id,
            car_id: claim.car_id,
            claim_date: claim.claim_date,
            description: claim.description,
            amount: claim.amount,
        })
    }

    /// All cars joined with their owner's name and email, ordered by car id.
    pub async fn list_cars(&self) -> InsuranceResult<Vec<CarWithOwner>> {
        const SQL: &str = r#"
            SELECT c.id, c.vin, c.make, c.model, c.year_of_manufacture, c.owner_id,
                   o.name AS owner_name, o.email AS owner_email
            FROM cars c
            JOIN owners o ON o.id = c.owner_id
            ORDER BY c.id
        "#;

        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, CarWithOwner>(SQL)
                .fetch_all(pool)
                .await
                .map_err(db_error("SQLite list_cars")),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, CarWithOwner>(SQL)
                .fetch_all(pool)
                .await
                .map_err(db_error("Postgres list_cars")),
        }
    }

    /// Whether a car with this id exists.
    pub async fn car_exists(&self, car_id: i64) -> InsuranceResult<bool> {
        let count: i64 = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_scalar("SELECT COUNT(*) FROM cars WHERE id = ?")
                .bind(car_id)
                .fetch_one(pool)
                .await
                .map_err(db_error("SQLite car_exists"))?,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_scalar("SELECT COUNT(*) FROM cars WHERE id = $1")
                .bind(car_id)
                .fetch_one(pool)
                .await
                .map_err(db_error("Postgres car_exists"))?,
        };

        Ok(count > 0)
    }

    /// Fetch a car by id.
    ///
    /// Returns:
    /// - `Ok(Some(Car))` if found
    /// - `Ok(None)` if not found
    /// - `Err(InsuranceError::DatabaseError)` on DB failure
    pub async fn get_car(&self, car_id: i64) -> InsuranceResult<Option<Car>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, Car>(
                "SELECT id, vin, make, model, year_of_manufacture, owner_id FROM cars WHERE id = ?",
            )
            .bind(car_id)
            .fetch_optional(pool)
            .await
            .map_err(db_error("SQLite get_car")),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, Car>(
                "SELECT id, vin, make, model, year_of_manufacture, owner_id FROM cars WHERE id = $1",
            )
            .bind(car_id)
            .fetch_optional(pool)
            .await
            .map_err(db_error("Postgres get_car")),
        }
    }

    /// Whether any policy of `car_id` has `start_date <= date <= end_date`.
    pub async fn has_valid_policy(&self, car_id: i64, date: NaiveDate) -> InsuranceResult<bool> {
        let count: i64 = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_scalar(
                "SELECT COUNT(*) FROM policies \
                 WHERE car_id = ? AND start_date <= ? AND end_date >= ?",
            )
            .bind(car_id)
            .bind(date)
            .bind(date)
            .fetch_one(pool)
            .await
            .map_err(db_error("SQLite has_valid_policy"))?,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_scalar(
                "SELECT COUNT(*) FROM policies \
                 WHERE car_id = $1 AND start_date <= $2 AND end_date >= $2",
            )
            .bind(car_id)
            .bind(date)
            .fetch_one(pool)
            .await
            .map_err(db_error("Postgres has_valid_policy"))?,
        };

        Ok(count > 0)
    }

    /// Policies of one car, ordered by id.
    pub async fn policies_for_car(&self, car_id: i64) -> InsuranceResult<Vec<InsurancePolicy>> {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, InsurancePolicy>(
                "SELECT id, car_id, provider, start_date, end_date \
                 FROM policies WHERE car_id = ? ORDER BY id",
            )
            .bind(car_id)
            .fetch_all(pool)
            .await
            .map_err(db_error("SQLite policies_for_car")),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, InsurancePolicy>(
                "SELECT id, car_id, provider, start_date, end_date \
                 FROM policies WHERE car_id = $1 ORDER BY id",
            )
            .bind(car_id)
            .fetch_all(pool)
            .await
            .map_err(db_error("Postgres policies_for_car")),
        }
    }

    /// Claims of one car, ordered by id.
    pub async fn claims_for_car(&self, car_id: i64) -> InsuranceResult<Vec<Claim>> {
        let rows = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_as::<_, ClaimRow>(
                "SELECT id, car_id, claim_date, description, amount \
                 FROM claims WHERE car_id = ? ORDER BY id",
            )
            .bind(car_id)
            .fetch_all(pool)
            .await
            .map_err(db_error("SQLite claims_for_car"))?,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_as::<_, ClaimRow>(
                "SELECT id, car_id, claim_date, description, amount::TEXT AS amount \
                 FROM claims WHERE car_id = $1 ORDER BY id",
            )
            .bind(car_id)
            .fetch_all(pool)
            .await
            .map_err(db_error("Postgres claims_for_car"))?,
        };

        rows.into_iter().map(Claim::try_from).collect()
    }

    /// All policies whose end date is on or before `date`, ordered by id.
    pub async fn policies_ending_on_or_before(
        &self,
        date: NaiveDate,
    ) -> InsuranceResult<Vec<InsurancePolicy>> {
        self.acquire()
            .await?
            .policies_ending_on_or_before(date)
            .await
    }

    /// Insert a handful of owners, cars and policies when the store is empty.
    ///
    /// Returns `true` if anything was inserted.
    pub async fn seed_demo_data(&self) -> InsuranceResult<bool> {
        let owners: i64 = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => query_scalar("SELECT COUNT(*) FROM owners")
                .fetch_one(pool)
                .await
                .map_err(db_error("SQLite seed_demo_data"))?,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => query_scalar("SELECT COUNT(*) FROM owners")
                .fetch_one(pool)
                .await
                .map_err(db_error("Postgres seed_demo_data"))?,
        };

        if owners > 0 {
            return Ok(false);
        }

        let ana = self
            .insert_owner("Ana Pop", Some("ana.pop@example.com"))
            .await?;
        let bogdan = self
            .insert_owner("Bogdan Ionescu", Some("bogdan.ionescu@example.com"))
            .await?;

        let demo_cars = [
            ("VIN12345", "Dacia", "Logan", 2018, ana.id),
            ("VIN67890", "VW", "Golf", 2021, bogdan.id),
            ("VIN24680", "Ford", "Focus", 2016, bogdan.id),
        ];

        let mut car_ids = Vec::with_capacity(demo_cars.len());
        for (vin, make, model, year, owner_id) in demo_cars {
            let car = self
                .insert_car(Car {
                    id: 0,
                    vin: vin.to_string(),
                    make: Some(make.to_string()),
                    model: Some(model.to_string()),
                    year_of_manufacture: year,
                    owner_id,
                })
                .await?;
            car_ids.push(car.id);
        }

        let demo_policies = [
            (car_ids[0], "Allianz", (2024, 1, 1), (2024, 12, 31)),
            (car_ids[0], "Groupama", (2025, 1, 1), (2025, 12, 31)),
            (car_ids[1], "Allianz", (2025, 3, 1), (2025, 9, 30)),
            (car_ids[2], "Generali", (2025, 6, 1), (2026, 5, 31)),
        ];

        for (car_id, provider, start, end) in demo_policies {
            let (Some(start_date), Some(end_date)) = (
                NaiveDate::from_ymd_opt(start.0, start.1, start.2),
                NaiveDate::from_ymd_opt(end.0, end.1, end.2),
            ) else {
                continue;
            };

            self.insert_policy(NewPolicy {
                car_id,
                provider: provider.to_string(),
                start_date,
                end_date,
            })
            .await?;
        }

        info!(
            "Seeded demo data: 2 owners, {} cars, {} policies",
            car_ids.len(),
            demo_policies.len()
        );

        Ok(true)
    }
}

impl DbScope {
    /// All policies whose end date is on or before `date`, ordered by id.
    pub async fn policies_ending_on_or_before(
        &mut self,
        date: NaiveDate,
    ) -> InsuranceResult<Vec<InsurancePolicy>> {
        match self {
            #[cfg(feature = "sqlite")]
            DbScope::SQLite(conn) => {
                query_as::<_, InsurancePolicy>(SQLITE_POLICIES_ENDING_ON_OR_BEFORE)
                    .bind(date)
                    .fetch_all(&mut **conn)
                    .await
                    .map_err(db_error("SQLite policies_ending_on_or_before"))
            }
            #[cfg(feature = "postgres")]
            DbScope::Postgres(conn) => {
                query_as::<_, InsurancePolicy>(POSTGRES_POLICIES_ENDING_ON_OR_BEFORE)
                    .bind(date)
                    .fetch_all(&mut **conn)
                    .await
                    .map_err(db_error("Postgres policies_ending_on_or_before"))
            }
        }
    }
}
