//! Customers (recurring buyers).

use std::sync::Arc;

use serde_json::Value;

use crate::batch::{record_id, Endpoint, Entity, Updatable};
use crate::clock::Clock;
use crate::date::IntoTimestamp;
use crate::fields::{Field, FieldBag, IntoTags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerField {
    Name,
    MainUserId,
    NextPrice,
    Periodicity,
    Tags,
    NextDate,
    RequestId,
    /// Written by [`Customer::set_last_modified`] only; not settable by name.
    LastModified,
}

impl Field for CustomerField {
    const WHITELIST: &'static [Self] = &[
        CustomerField::Name,
        CustomerField::MainUserId,
        CustomerField::NextPrice,
        CustomerField::Periodicity,
        CustomerField::Tags,
        CustomerField::NextDate,
        CustomerField::RequestId,
    ];

    fn name(self) -> &'static str {
        match self {
            CustomerField::Name => "name",
            CustomerField::MainUserId => "main_user_id",
            CustomerField::NextPrice => "next_price",
            CustomerField::Periodicity => "periodicity",
            CustomerField::Tags => "tags",
            CustomerField::NextDate => "next_date",
            CustomerField::RequestId => "request_id",
            CustomerField::LastModified => "last_modified",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Customer {
    fields: FieldBag<CustomerField>,
}

impl Customer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            fields: FieldBag::with_clock(clock),
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.fields.set(CustomerField::Name, name.into());
        self
    }

    pub fn set_main_user_id(&mut self, user_id: i64) -> &mut Self {
        self.fields.set(CustomerField::MainUserId, user_id);
        self
    }

    pub fn set_next_price(&mut self, price: impl Into<Value>) -> &mut Self {
        self.fields.set(CustomerField::NextPrice, price);
        self
    }

    /// Days between purchases.
    pub fn set_periodicity(&mut self, days: i64) -> &mut Self {
        self.fields.set(CustomerField::Periodicity, days);
        self
    }

    pub fn set_tags(&mut self, tags: impl IntoTags) -> &mut Self {
        self.fields.set_tags(CustomerField::Tags, tags);
        self
    }

    /// Date of the next expected purchase.
    pub fn set_next_date(&mut self, date: impl IntoTimestamp) -> &mut Self {
        self.fields.set_date(CustomerField::NextDate, date);
        self
    }

    pub fn set_request_id(&mut self, request_id: i64) -> &mut Self {
        self.fields.set(CustomerField::RequestId, request_id);
        self
    }

    pub fn set_last_modified(&mut self, date: impl IntoTimestamp) -> &mut Self {
        self.fields.set_date(CustomerField::LastModified, date);
        self
    }
}

impl Entity for Customer {
    type Field = CustomerField;
    type Added = i64;

    const ENDPOINT: Endpoint = Endpoint {
        kind: "customers",
        list_path: "/private/api/v2/json/customers/list",
        set_path: "/private/api/v2/json/customers/set",
        list_key: "customers",
        add_op: "add",
        added_path: &["customers"],
    };

    fn fields(&self) -> &FieldBag<CustomerField> {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut FieldBag<CustomerField> {
        &mut self.fields
    }

    fn added(record: Value) -> Option<i64> {
        record_id(record)
    }
}

impl Updatable for Customer {}
