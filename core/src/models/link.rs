//! Links between entities and catalog elements.
//!
//! Links are added with the `link` operation and removed with `unlink`.
//! The add reply echoes the whole link record back, so `Added` is the raw
//! record rather than an id.

use std::sync::Arc;

use serde_json::Value;

use crate::batch::{Endpoint, Entity};
use crate::clock::Clock;
use crate::fields::{Field, FieldBag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkField {
    From,
    FromId,
    To,
    ToId,
    FromCatalogId,
    ToCatalogId,
    Quantity,
}

impl Field for LinkField {
    const WHITELIST: &'static [Self] = &[
        LinkField::From,
        LinkField::FromId,
        LinkField::To,
        LinkField::ToId,
        LinkField::FromCatalogId,
        LinkField::ToCatalogId,
        LinkField::Quantity,
    ];

    fn name(self) -> &'static str {
        match self {
            LinkField::From => "from",
            LinkField::FromId => "from_id",
            LinkField::To => "to",
            LinkField::ToId => "to_id",
            LinkField::FromCatalogId => "from_catalog_id",
            LinkField::ToCatalogId => "to_catalog_id",
            LinkField::Quantity => "quantity",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Link {
    fields: FieldBag<LinkField>,
}

impl Link {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            fields: FieldBag::with_clock(clock),
        }
    }

    /// Source side: entity type name (`leads`, `contacts`, ...) and id.
    pub fn set_from(&mut self, entity: impl Into<String>, id: i64) -> &mut Self {
        self.fields.set(LinkField::From, entity.into());
        self.fields.set(LinkField::FromId, id);
        self
    }

    /// Target side: entity type name (`catalog_elements`, ...) and id.
    pub fn set_to(&mut self, entity: impl Into<String>, id: i64) -> &mut Self {
        self.fields.set(LinkField::To, entity.into());
        self.fields.set(LinkField::ToId, id);
        self
    }

    pub fn set_from_catalog_id(&mut self, catalog_id: i64) -> &mut Self {
        self.fields.set(LinkField::FromCatalogId, catalog_id);
        self
    }

    pub fn set_to_catalog_id(&mut self, catalog_id: i64) -> &mut Self {
        self.fields.set(LinkField::ToCatalogId, catalog_id);
        self
    }

    pub fn set_quantity(&mut self, quantity: impl Into<Value>) -> &mut Self {
        self.fields.set(LinkField::Quantity, quantity);
        self
    }
}

impl Entity for Link {
    type Field = LinkField;
    type Added = Value;

    const ENDPOINT: Endpoint = Endpoint {
        kind: "links",
        list_path: "/private/api/v2/json/links/list",
        set_path: "/private/api/v2/json/links/set",
        list_key: "leads",
        add_op: "link",
        added_path: &[],
    };

    fn fields(&self) -> &FieldBag<LinkField> {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut FieldBag<LinkField> {
        &mut self.fields
    }

    fn added(record: Value) -> Option<Value> {
        Some(record)
    }
}
