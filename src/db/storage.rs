use crate::db::models::{NewSchool, School};
use crate::db::schema::init_for_backend;
use crate::error::SchoolsError;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::AnyPool;
use std::time::Duration;
use tracing::{debug, info};

/// How long a request may wait for a pooled connection. Large enough to
/// never expire in practice while staying clear of `Instant` overflow.
const ACQUIRE_WAIT: Duration = Duration::from_secs(u32::MAX as u64);

const SCHOOL_COLUMNS: &str = "id, name, address, city, state, contact, image, email_id";

#[derive(Clone)]
pub struct SchoolsStorage {
    pool: AnyPool,
}

impl SchoolsStorage {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Build the shared pool. Callers beyond `max_connections` queue until a
    /// connection is returned; every query hands its connection back.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, SchoolsError> {
        install_default_drivers();
        let pool = pool_options(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Create the `schools` table for whichever backend the pool talks to.
    pub async fn init_schema(&self) -> Result<(), SchoolsError> {
        let backend = {
            let conn = self.pool.acquire().await?;
            conn.backend_name().to_string()
        };
        sqlx::query(init_for_backend(&backend))
            .execute(&self.pool)
            .await?;
        info!(backend = %backend, "schools schema ready");
        Ok(())
    }

    /// Insert one row; columns are bound in the fixed order
    /// name, address, city, state, contact, image, email_id.
    /// Returns the new row id when the driver reports it.
    pub async fn insert(&self, school: &NewSchool, image: &str) -> Result<Option<i64>, SchoolsError> {
        let result = sqlx::query(
            r#"
            INSERT INTO schools (name, address, city, state, contact, image, email_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(school.name.as_str())
        .bind(school.address.as_str())
        .bind(school.city.as_str())
        .bind(school.state.as_str())
        .bind(school.contact.as_str())
        .bind(image)
        .bind(school.email_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(SchoolsError::InsertFailed)?;

        let id = result.last_insert_id();
        debug!(id = ?id, image = %image, "inserted school");
        Ok(id)
    }

    /// Every row, most recently inserted first.
    pub async fn list(&self) -> Result<Vec<School>, SchoolsError> {
        sqlx::query_as::<_, School>(&format!(
            "SELECT {SCHOOL_COLUMNS} FROM schools ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(SchoolsError::FetchFailed)
    }

    pub async fn get(&self, id: i64) -> Result<Option<School>, SchoolsError> {
        sqlx::query_as::<_, School>(&format!(
            "SELECT {SCHOOL_COLUMNS} FROM schools WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SchoolsError::FetchFailed)
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn pool_options(max_connections: u32) -> AnyPoolOptions {
    AnyPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(ACQUIRE_WAIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_storage() -> SchoolsStorage {
        let storage = SchoolsStorage::connect("sqlite::memory:", 1)
            .await
            .expect("connect sqlite");
        storage.init_schema().await.expect("init schema");
        storage
    }

    fn school(name: &str) -> NewSchool {
        NewSchool {
            name: name.to_string(),
            address: "1 Main St".into(),
            city: "Pune".into(),
            state: "Maharashtra".into(),
            contact: "9876543210".into(),
            email_id: "info@example.org".into(),
        }
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let storage = memory_storage().await;
        for name in ["first", "second", "third"] {
            storage
                .insert(&school(name), &format!("/schoolImages/{name}.png"))
                .await
                .expect("insert");
        }

        let rows = storage.list().await.expect("list");
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["third", "second", "first"]);
        assert!(rows.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[tokio::test]
    async fn insert_reports_id_and_get_finds_it() {
        let storage = memory_storage().await;
        let id = storage
            .insert(&school("lookup"), "/schoolImages/1-lookup.png")
            .await
            .expect("insert")
            .expect("sqlite reports insert id");

        let row = storage.get(id).await.expect("get").expect("row exists");
        assert_eq!(row.image, "/schoolImages/1-lookup.png");
        assert_eq!(row.email_id, "info@example.org");
        assert!(storage.get(id + 100).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn insert_without_table_is_insert_failure() {
        let storage = SchoolsStorage::connect("sqlite::memory:", 1)
            .await
            .expect("connect sqlite");
        let err = storage
            .insert(&school("orphan"), "/schoolImages/x.png")
            .await
            .unwrap_err();
        assert!(matches!(err, SchoolsError::InsertFailed(_)));
    }

    #[test]
    fn pool_waits_do_not_expire() {
        let options = pool_options(4);
        assert_eq!(options.get_max_connections(), 4);
        assert!(options.get_acquire_timeout() >= Duration::from_secs(365 * 24 * 60 * 60));
    }

    #[tokio::test]
    async fn busy_pool_queues_past_the_default_timeout() {
        let storage = memory_storage().await;
        let held = storage.pool().acquire().await.expect("acquire");

        let waiting = {
            let storage = storage.clone();
            tokio::spawn(async move { storage.list().await })
        };
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert!(!waiting.is_finished(), "list gave up while the pool was busy");

        drop(held);
        let rows = waiting.await.expect("join").expect("list after release");
        assert!(rows.is_empty());
    }
}
