use std::{sync::Arc, time::Duration};

use kameo::{actor::ActorRef, messages, Actor};
use lru_time_cache::LruCache;
use tracing::debug;

use crate::{catalogue::VideoRecord, session::SessionId, Error, Result};

// Messages are handled one at a time, so a lookup never observes a record
// that is halfway replaced.
#[derive(Actor)]
pub struct RecordStore {
  records: LruCache<String, Arc<VideoRecord>>,
}

#[derive(Clone)]
pub struct RecordStoreRef(ActorRef<RecordStore>);

#[messages]
impl RecordStore {
  #[message]
  async fn put(&mut self, id: String, record: Arc<VideoRecord>) -> Result<()> {
    if self.records.insert(id, record).is_some() {
      debug!("replaced previous record");
    }
    Ok(())
  }

  #[message]
  async fn get(&mut self, id: String) -> Result<Option<Arc<VideoRecord>>> {
    let (record, evicted) = self.records.notify_get(&id);
    if !evicted.is_empty() {
      debug!("evicted {} expired records", evicted.len());
    }
    Ok(record.cloned())
  }
}

impl RecordStore {
  pub fn new(capacity: usize, ttl: Duration) -> Self {
    // expire a record once it goes unused for `ttl`, and keep at most
    // `capacity` of them
    let records =
      LruCache::with_expiry_duration_and_capacity(ttl, capacity.max(1));
    Self { records }
  }

  pub fn spawn(self) -> RecordStoreRef {
    RecordStoreRef(kameo::spawn(self))
  }
}

impl RecordStoreRef {
  pub async fn put(
    &self,
    id: &SessionId,
    record: Arc<VideoRecord>,
  ) -> Result<()> {
    let id = id.to_string();
    self
      .0
      .ask(Put { id, record })
      .send()
      .await
      .map_err(|e| Error::Store(format!("{e:?}")))
  }

  pub async fn get(
    &self,
    id: &SessionId,
  ) -> Result<Option<Arc<VideoRecord>>> {
    let id = id.to_string();
    self
      .0
      .ask(Get { id })
      .send()
      .await
      .map_err(|e| Error::Store(format!("{e:?}")))
  }

  pub async fn contains(&self, id: &SessionId) -> Result<bool> {
    Ok(self.get(id).await?.is_some())
  }
}
