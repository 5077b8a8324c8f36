//! Entry point: one account, one transport, one clock.
//!
//! # Design
//! `Crm` owns the transport and the clock. `Crm::customers()`,
//! `Crm::tasks()` and `Crm::links()` hand out a borrowed [`Resource`] per
//! entity type; the resource builds the batch envelope, sends it and reads
//! the reply. Entities passed to `add`/`update` are consumed, so each one
//! is sent at most once.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::batch::{self, Batch, Entity, Updatable};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::date::timestamp_or_zero;
use crate::error::{ApiError, ApiResult};
use crate::models::{Customer, Link, Task};
use crate::transport::{Execute, HttpTransport, Transport};

pub struct Crm<T> {
    transport: T,
    clock: Arc<dyn Clock>,
}

impl<X: Execute> Crm<HttpTransport<X>> {
    /// Crm speaking the v2 wire format, with `executor` doing the HTTP.
    pub fn connect(config: Config, executor: X) -> Self {
        Self::new(HttpTransport::new(config, executor))
    }
}

impl<T: Transport> Crm<T> {
    pub fn new(transport: T) -> Self {
        Self::with_clock(transport, Arc::new(SystemClock))
    }

    pub fn with_clock(transport: T, clock: Arc<dyn Clock>) -> Self {
        Self { transport, clock }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn customers(&self) -> Resource<'_, Customer, T> {
        Resource::new(self)
    }

    pub fn tasks(&self) -> Resource<'_, Task, T> {
        Resource::new(self)
    }

    pub fn links(&self) -> Resource<'_, Link, T> {
        Resource::new(self)
    }

    /// Empty customer whose date setters use this Crm's clock.
    pub fn customer(&self) -> Customer {
        Customer::with_clock(Arc::clone(&self.clock))
    }

    pub fn task(&self) -> Task {
        Task::with_clock(Arc::clone(&self.clock))
    }

    pub fn link(&self) -> Link {
        Link::with_clock(Arc::clone(&self.clock))
    }
}

/// List/add/update for one entity type.
pub struct Resource<'a, E, T> {
    crm: &'a Crm<T>,
    _entity: PhantomData<E>,
}

impl<'a, E: Entity, T: Transport> Resource<'a, E, T> {
    fn new(crm: &'a Crm<T>) -> Self {
        Self {
            crm,
            _entity: PhantomData,
        }
    }

    /// Records matching `params`, optionally only those changed since
    /// `modified_since` (any format the date setters accept).
    pub fn list(&self, params: &[(&str, &str)], modified_since: Option<&str>) -> ApiResult<Vec<Value>> {
        let endpoint = E::ENDPOINT;
        let query: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let since = modified_since.map(|date| timestamp_or_zero(date, self.crm.clock()));
        let response = self.crm.transport.get(endpoint.list_path, &query, since)?;
        Ok(batch::list_items(&endpoint, response))
    }

    /// Add `entities` in one request.
    ///
    /// One entity gives [`Batch::One`], several give [`Batch::Many`] in
    /// submission order. A returned record without a usable result is
    /// `None` in its slot. A reply without the add section, or an empty
    /// input, gives an empty `Batch::Many`.
    pub fn add(&self, entities: Vec<E>) -> ApiResult<Batch<Option<E::Added>>> {
        if entities.is_empty() {
            return Ok(Batch::default());
        }
        let endpoint = E::ENDPOINT;
        let body = batch::add_request(&entities);
        debug!(kind = endpoint.kind, count = entities.len(), "adding");
        let response = self.crm.transport.post(endpoint.set_path, &body)?;
        Ok(batch::added_items::<E>(entities.len(), response))
    }

    /// Add a single entity. `None` when the reply carries no result for it.
    pub fn add_one(&self, entity: E) -> ApiResult<Option<E::Added>> {
        Ok(self.add(vec![entity])?.single().flatten())
    }
}

impl<E: Updatable, T: Transport> Resource<'_, E, T> {
    /// Update record `id` with the entity's fields plus `extra`.
    ///
    /// `modified` defaults to the clock's current time. Returns whether
    /// the reply carried the entity's section.
    pub fn update_with(
        &self,
        entity: E,
        id: i64,
        modified: Option<&str>,
        extra: Map<String, Value>,
    ) -> ApiResult<bool> {
        check_id(id)?;
        let endpoint = E::ENDPOINT;
        let clock = self.crm.clock();
        let last_modified = match modified {
            Some(date) => timestamp_or_zero(date, clock),
            None => clock.now().timestamp(),
        };
        let record = batch::update_record(&entity, id, extra, last_modified);
        let body = batch::envelope(endpoint.kind, "update", vec![record]);
        debug!(kind = endpoint.kind, id, "updating");
        let response = self.crm.transport.post(endpoint.set_path, &body)?;
        Ok(batch::has_section(&endpoint, &response))
    }
}

impl<T: Transport> Resource<'_, Customer, T> {
    pub fn update(&self, customer: Customer, id: i64, modified: Option<&str>) -> ApiResult<bool> {
        self.update_with(customer, id, modified, Map::new())
    }
}

impl<T: Transport> Resource<'_, Task, T> {
    /// Update task `id`, replacing its text and completion status.
    pub fn update(
        &self,
        task: Task,
        id: i64,
        text: &str,
        completed: bool,
        modified: Option<&str>,
    ) -> ApiResult<bool> {
        let mut extra = Map::new();
        extra.insert("text".to_string(), Value::from(text));
        extra.insert("status".to_string(), Value::from(i64::from(completed)));
        self.update_with(task, id, modified, extra)
    }
}

impl<T: Transport> Resource<'_, Link, T> {
    /// Remove `links` in one request. Returns whether the reply carried
    /// the `links` section.
    pub fn unlink(&self, links: Vec<Link>) -> ApiResult<bool> {
        if links.is_empty() {
            return Ok(false);
        }
        let endpoint = Link::ENDPOINT;
        let records = links.iter().map(Link::values).collect();
        let body = batch::envelope(endpoint.kind, "unlink", records);
        let response = self.crm.transport.post(endpoint.set_path, &body)?;
        Ok(batch::has_section(&endpoint, &response))
    }
}

fn check_id(id: i64) -> ApiResult<()> {
    if id < 1 {
        return Err(ApiError::InvalidArgument(format!(
            "id must be a positive integer, got {id}"
        )));
    }
    Ok(())
}
