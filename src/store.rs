use std::collections::BTreeMap;

use rocket::fairing::AdHoc;
use rocket::tokio::sync::{broadcast, RwLock};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket_db_pools::diesel::prelude::*;
use rocket_db_pools::diesel::{MysqlPool, RunQueryDsl};
use rocket_db_pools::Database;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Storage;
use crate::error::{Error, Result};
use crate::models::{Guest, GuestPatch};

#[derive(Database)]
#[database("rsvp")]
pub struct Db(MysqlPool);

pub const DUPLICATE_ID: &str = "Unique ID already exists!";

/// Document-style access to the `invitees` collection.
#[rocket::async_trait]
pub trait GuestStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Guest>>;
    async fn list(&self) -> Result<Vec<Guest>>;
    /// Creates the record. Fails with a validation error if the key is taken.
    async fn insert(&self, guest: &Guest) -> Result<()>;
    /// Creates the record, or overwrites it whole if the key exists.
    async fn set(&self, guest: &Guest) -> Result<()>;
    /// Merges the named fields into an existing record.
    async fn update(&self, id: &str, patch: &GuestPatch) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryGuests {
    guests: RwLock<BTreeMap<String, Guest>>,
}

#[rocket::async_trait]
impl GuestStore for MemoryGuests {
    async fn get(&self, id: &str) -> Result<Option<Guest>> {
        Ok(self.guests.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Guest>> {
        Ok(self.guests.read().await.values().cloned().collect())
    }

    async fn insert(&self, guest: &Guest) -> Result<()> {
        let mut guests = self.guests.write().await;
        if guests.contains_key(&guest.id) {
            return Err(Error::validation(DUPLICATE_ID));
        }
        guests.insert(guest.id.clone(), guest.clone());
        Ok(())
    }

    async fn set(&self, guest: &Guest) -> Result<()> {
        self.guests
            .write()
            .await
            .insert(guest.id.clone(), guest.clone());
        Ok(())
    }

    async fn update(&self, id: &str, patch: &GuestPatch) -> Result<()> {
        let mut guests = self.guests.write().await;
        let guest = guests.get_mut(id).ok_or(Error::NotFound)?;
        patch.apply(guest);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        match self.guests.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound),
        }
    }
}

pub struct MysqlGuests {
    pool: MysqlPool,
}

/// MySQL reports only rows whose values changed, so a zero count is NotFound
/// only when the row is really absent.
fn settle_update(changed: usize, present: bool) -> Result<()> {
    if changed == 0 && !present {
        return Err(Error::NotFound);
    }
    Ok(())
}

fn insert_conflict(e: DieselError) -> Error {
    match e {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            Error::validation(DUPLICATE_ID)
        }
        other => Error::Database(other),
    }
}

impl MysqlGuests {
    pub fn new(pool: MysqlPool) -> Self {
        MysqlGuests { pool }
    }
}

#[rocket::async_trait]
impl GuestStore for MysqlGuests {
    async fn get(&self, key: &str) -> Result<Option<Guest>> {
        use crate::schema::invitees::dsl::*;
        let mut conn = self.pool.get().await.map_err(|e| Error::Pool(e.to_string()))?;

        let guest = invitees
            .find(key)
            .select(Guest::as_select())
            .first(&mut *conn)
            .await
            .optional()?;
        Ok(guest)
    }

    async fn list(&self) -> Result<Vec<Guest>> {
        use crate::schema::invitees::dsl::*;
        let mut conn = self.pool.get().await.map_err(|e| Error::Pool(e.to_string()))?;

        let guests = invitees
            .select(Guest::as_select())
            .load(&mut *conn)
            .await?;
        Ok(guests)
    }

    async fn insert(&self, guest: &Guest) -> Result<()> {
        use crate::schema::invitees::dsl::*;
        let mut conn = self.pool.get().await.map_err(|e| Error::Pool(e.to_string()))?;

        diesel::insert_into(invitees)
            .values(guest)
            .execute(&mut *conn)
            .await
            .map_err(insert_conflict)?;
        Ok(())
    }

    async fn set(&self, guest: &Guest) -> Result<()> {
        use crate::schema::invitees::dsl::*;
        let mut conn = self.pool.get().await.map_err(|e| Error::Pool(e.to_string()))?;

        diesel::replace_into(invitees)
            .values(guest)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn update(&self, key: &str, patch: &GuestPatch) -> Result<()> {
        use crate::schema::invitees::dsl::*;
        let mut conn = self.pool.get().await.map_err(|e| Error::Pool(e.to_string()))?;

        let changed = diesel::update(invitees.find(key))
            .set(patch)
            .execute(&mut *conn)
            .await?;
        if changed > 0 {
            return Ok(());
        }

        let present = invitees
            .find(key)
            .count()
            .get_result::<i64>(&mut *conn)
            .await?;
        settle_update(changed, present > 0)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        use crate::schema::invitees::dsl::*;
        let mut conn = self.pool.get().await.map_err(|e| Error::Pool(e.to_string()))?;

        let removed = diesel::delete(invitees.find(key))
            .execute(&mut *conn)
            .await?;
        if removed == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}

/// A committed write, published to live summary subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Change {
    Created(String),
    Updated(String),
    Deleted(String),
}

/// The guest collection as the routes see it.
pub struct Guests {
    store: Box<dyn GuestStore>,
    changes: broadcast::Sender<Change>,
}

impl Guests {
    pub fn new(store: impl GuestStore + 'static) -> Self {
        let (changes, _) = broadcast::channel(64);
        Guests {
            store: Box::new(store),
            changes,
        }
    }

    pub fn in_memory() -> Self {
        Guests::new(MemoryGuests::default())
    }

    pub async fn get(&self, id: &str) -> Result<Guest> {
        self.store.get(id).await?.ok_or(Error::NotFound)
    }

    pub async fn all(&self) -> Result<Vec<Guest>> {
        self.store.list().await
    }

    pub async fn create(&self, guest: &Guest) -> Result<()> {
        self.store.insert(guest).await?;
        self.publish(Change::Created(guest.id.clone()));
        Ok(())
    }

    pub async fn update(&self, id: &str, patch: &GuestPatch) -> Result<()> {
        self.store.update(id, patch).await?;
        self.publish(Change::Updated(id.to_string()));
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        self.publish(Change::Deleted(id.to_string()));
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }

    fn publish(&self, change: Change) {
        // No subscribers is the common case.
        let _ = self.changes.send(change);
    }
}

/// Attaches the configured guest store as managed `Guests` state.
pub fn stage(storage: Storage) -> AdHoc {
    AdHoc::on_ignite("Guest store", move |rocket| async move {
        match storage {
            Storage::Memory => {
                warn!("using the in-memory guest store; responses are lost on restart");
                rocket.manage(Guests::in_memory())
            }
            Storage::Mysql => rocket
                .attach(Db::init())
                .attach(AdHoc::try_on_ignite("MySQL guests", |rocket| async {
                    match Db::fetch(&rocket) {
                        Some(db) => {
                            info!("using the MySQL guest store");
                            let guests = Guests::new(MysqlGuests::new((**db).clone()));
                            Ok(rocket.manage(guests))
                        }
                        None => Err(rocket),
                    }
                })),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attending;

    fn ada() -> Guest {
        Guest::invite("g1".into(), "Ada".into(), "AB12".into(), 3)
    }

    #[rocket::async_test]
    async fn missing_guest_is_not_found() {
        let guests = Guests::in_memory();
        assert!(matches!(guests.get("nobody").await, Err(Error::NotFound)));
        assert!(matches!(
            guests.update("nobody", &GuestPatch::response(Attending::No, 0)).await,
            Err(Error::NotFound)
        ));
        assert!(matches!(guests.delete("nobody").await, Err(Error::NotFound)));
    }

    #[rocket::async_test]
    async fn deleted_guest_is_no_longer_found() {
        let guests = Guests::in_memory();
        guests.create(&ada()).await.unwrap();
        assert_eq!(guests.get("g1").await.unwrap(), ada());

        guests.delete("g1").await.unwrap();
        assert!(matches!(guests.get("g1").await, Err(Error::NotFound)));
        assert!(guests.all().await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn set_overwrites_the_whole_record() {
        let store = MemoryGuests::default();
        let mut guest = ada();
        guest.attending = Some(Attending::Yes);
        guest.attendance_updated_count = 2;
        store.set(&guest).await.unwrap();

        store.set(&ada()).await.unwrap();
        assert_eq!(store.get("g1").await.unwrap().unwrap().attending, None);
    }

    #[rocket::async_test]
    async fn create_never_overwrites_an_existing_guest() {
        let guests = Guests::in_memory();
        let mut guest = ada();
        guest.attending = Some(Attending::Yes);
        guest.attendance_updated_count = 2;
        guests.create(&guest).await.unwrap();
        let mut changes = guests.subscribe();

        match guests.create(&ada()).await {
            Err(Error::Validation(message)) => assert_eq!(message, DUPLICATE_ID),
            other => panic!("expected a duplicate id error, got {other:?}"),
        }
        assert_eq!(guests.get("g1").await.unwrap(), guest);
        assert!(changes.try_recv().is_err());
    }

    #[rocket::async_test]
    async fn unchanged_update_of_an_existing_guest_succeeds() {
        let guests = Guests::in_memory();
        guests.create(&ada()).await.unwrap();
        let patch = GuestPatch::response(Attending::No, 0);

        guests.update("g1", &patch).await.unwrap();
        guests.update("g1", &patch).await.unwrap();
        assert_eq!(guests.get("g1").await.unwrap().attending, Some(Attending::No));
    }

    #[test]
    fn zero_changed_rows_is_not_found_only_when_the_row_is_absent() {
        assert!(settle_update(0, true).is_ok());
        assert!(settle_update(1, true).is_ok());
        assert!(matches!(settle_update(0, false), Err(Error::NotFound)));
    }

    #[test]
    fn unique_violations_become_duplicate_id_errors() {
        let conflict = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(String::from("Duplicate entry 'g1' for key 'PRIMARY'")),
        );
        assert!(matches!(insert_conflict(conflict), Error::Validation(m) if m == DUPLICATE_ID));
        assert!(matches!(insert_conflict(DieselError::NotFound), Error::Database(_)));
    }

    #[rocket::async_test]
    async fn writes_are_published_to_subscribers() {
        let guests = Guests::in_memory();
        let mut changes = guests.subscribe();

        guests.create(&ada()).await.unwrap();
        guests
            .update("g1", &GuestPatch::response(Attending::No, 0))
            .await
            .unwrap();
        guests.delete("g1").await.unwrap();

        assert_eq!(changes.recv().await.unwrap(), Change::Created("g1".into()));
        assert_eq!(changes.recv().await.unwrap(), Change::Updated("g1".into()));
        assert_eq!(changes.recv().await.unwrap(), Change::Deleted("g1".into()));
    }

    #[rocket::async_test]
    async fn failed_writes_publish_nothing() {
        let guests = Guests::in_memory();
        let mut changes = guests.subscribe();

        assert!(guests.delete("g1").await.is_err());
        assert!(changes.try_recv().is_err());
    }
}
