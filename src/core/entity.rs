//! Record traits shared by every stored type

use crate::core::field::FieldValue;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identity, timestamps and lifecycle of a stored record.
///
/// `resource_name` is the URL collection (`clients`, `devices`) and
/// `resource_name_singular` the type tag written on every record. `status`
/// is the snake_case text of the record's own status enum.
pub trait Entity: Clone + Send + Sync + 'static {
    fn resource_name() -> &'static str;

    fn resource_name_singular() -> &'static str;

    fn id(&self) -> Uuid;

    fn entity_type(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;

    fn updated_at(&self) -> DateTime<Utc>;

    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn status(&self) -> &str;

    /// Stamp `deleted_at`; the record stays in the store
    fn mark_deleted(&mut self);

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}

/// A record with a display label and searchable fields.
pub trait Data: Entity {
    /// Client full name, device serial, invoice number, ...
    fn name(&self) -> &str;

    /// Fields the list endpoints and stores may search on
    fn indexed_fields() -> &'static [&'static str];

    /// Dynamic access to any declared field, plus the base fields
    fn field_value(&self, field: &str) -> Option<FieldValue>;

    /// Case-insensitive comparison of one field against query text
    fn field_matches(&self, field: &str, value: &str) -> bool {
        self.field_value(field)
            .is_some_and(|v| v.matches_str(value))
    }

    /// Owning client, for records that carry a `client_id`
    fn client_id(&self) -> Option<Uuid> {
        match self.field_value("client_id") {
            Some(FieldValue::Uuid(id)) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct Tag {
        id: Uuid,
        owner: Option<Uuid>,
        label: String,
        deleted_at: Option<DateTime<Utc>>,
    }

    impl Entity for Tag {
        fn resource_name() -> &'static str {
            "tags"
        }

        fn resource_name_singular() -> &'static str {
            "tag"
        }

        fn id(&self) -> Uuid {
            self.id
        }

        fn entity_type(&self) -> &str {
            "tag"
        }

        fn created_at(&self) -> DateTime<Utc> {
            DateTime::<Utc>::UNIX_EPOCH
        }

        fn updated_at(&self) -> DateTime<Utc> {
            DateTime::<Utc>::UNIX_EPOCH
        }

        fn deleted_at(&self) -> Option<DateTime<Utc>> {
            self.deleted_at
        }

        fn status(&self) -> &str {
            "active"
        }

        fn mark_deleted(&mut self) {
            self.deleted_at = Some(Utc::now());
        }
    }

    impl Data for Tag {
        fn name(&self) -> &str {
            &self.label
        }

        fn indexed_fields() -> &'static [&'static str] {
            &["name"]
        }

        fn field_value(&self, field: &str) -> Option<FieldValue> {
            match field {
                "name" => Some(FieldValue::String(self.label.clone())),
                "client_id" => self.owner.map(FieldValue::Uuid),
                _ => None,
            }
        }
    }

    fn tag(owner: Option<Uuid>) -> Tag {
        Tag {
            id: Uuid::new_v4(),
            owner,
            label: "Court Referral".to_string(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_soft_delete_marks_record() {
        let mut record = tag(None);
        assert!(!record.is_deleted());
        record.mark_deleted();
        assert!(record.is_deleted());
    }

    #[test]
    fn test_field_matches_ignores_case() {
        let record = tag(None);
        assert!(record.field_matches("name", "court referral"));
        assert!(!record.field_matches("name", "court"));
        assert!(!record.field_matches("missing", "court referral"));
    }

    #[test]
    fn test_client_id_reads_owner_field() {
        let owner = Uuid::new_v4();
        assert_eq!(tag(Some(owner)).client_id(), Some(owner));
        assert_eq!(tag(None).client_id(), None);
    }
}
