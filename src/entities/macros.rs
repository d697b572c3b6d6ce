//! Macros for reducing boilerplate when defining entities
//!
//! These macros generate the repetitive trait implementations needed
//! for each record type following the Entity/Data architecture.

/// Declare a string-backed enum used for statuses and kinds.
///
/// Generates `as_str`, `Display`, `FromStr`, serde (snake_case strings),
/// an `ALL` constant and the `IntoFieldValue` conversion used for search.
///
/// # Example
/// ```rust,ignore
/// string_enum!(DeviceStatus {
///     InStock => "in_stock",
///     Installed => "installed",
/// });
/// ```
#[macro_export]
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $type:ident { $( $variant:ident => $text:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $type {
            $(
                #[serde(rename = $text)]
                $variant
            ),+
        }

        impl $type {
            /// Every variant, in declaration order
            pub const ALL: &'static [$type] = &[ $( $type::$variant ),+ ];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( $type::$variant => $text ),+
                }
            }
        }

        impl ::std::fmt::Display for $type {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $type {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($type::$variant), )+
                    other => Err(format!(
                        "unknown {} '{}'",
                        stringify!($type),
                        other
                    )),
                }
            }
        }

        impl $crate::core::field::IntoFieldValue for $type {
            fn to_field_value(&self) -> $crate::core::field::FieldValue {
                $crate::core::field::FieldValue::String(self.as_str().to_string())
            }
        }
    };
}

/// Complete macro to create a Data entity with automatic trait implementations
///
/// Every specific field is reachable through `Data::field_value`, so the
/// storage layer can search on it without knowing the concrete type.
///
/// # Example
///
/// ```rust,ignore
/// impl_data_entity!(
///     Vehicle,
///     "vehicle",
///     "vehicles",
///     VehicleStatus,
///     ["name", "vin", "client_id"],
///     {
///         client_id: Uuid,
///         vin: String,
///     }
/// );
///
/// let vehicle = Vehicle::new("2016 Honda Civic".into(), VehicleStatus::Active, client_id, vin);
/// ```
#[macro_export]
macro_rules! impl_data_entity {
    (
        $type:ident,
        $type_name:expr,
        $plural:expr,
        $status_type:ty,
        [ $( $indexed_field:expr ),* $(,)? ],
        {
            $( $(#[$field_meta:meta])* $specific_field:ident : $specific_type:ty ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $type {
            /// Unique identifier for this entity
            pub id: ::uuid::Uuid,

            /// Type of the entity
            #[serde(rename = "type")]
            pub entity_type: String,

            pub created_at: ::chrono::DateTime<::chrono::Utc>,

            pub updated_at: ::chrono::DateTime<::chrono::Utc>,

            /// When this entity was soft-deleted (if applicable)
            #[serde(default)]
            pub deleted_at: Option<::chrono::DateTime<::chrono::Utc>>,

            /// Current lifecycle status
            pub status: $status_type,

            /// Human-readable label
            pub name: String,
            $( $(#[$field_meta])* pub $specific_field : $specific_type ),*
        }

        impl $crate::core::entity::Entity for $type {
            fn resource_name() -> &'static str {
                $plural
            }

            fn resource_name_singular() -> &'static str {
                $type_name
            }

            fn id(&self) -> ::uuid::Uuid {
                self.id
            }

            fn entity_type(&self) -> &str {
                &self.entity_type
            }

            fn created_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.created_at
            }

            fn updated_at(&self) -> ::chrono::DateTime<::chrono::Utc> {
                self.updated_at
            }

            fn deleted_at(&self) -> Option<::chrono::DateTime<::chrono::Utc>> {
                self.deleted_at
            }

            fn status(&self) -> &str {
                self.status.as_str()
            }

            fn mark_deleted(&mut self) {
                self.soft_delete();
            }
        }

        impl $crate::core::entity::Data for $type {
            fn name(&self) -> &str {
                &self.name
            }

            fn indexed_fields() -> &'static [&'static str] {
                &[ $( $indexed_field ),* ]
            }

            fn field_value(&self, field: &str) -> Option<$crate::core::field::FieldValue> {
                #[allow(unused_imports)]
                use $crate::core::field::IntoFieldValue;
                match field {
                    "id" => Some($crate::core::field::FieldValue::Uuid(self.id)),
                    "name" => Some($crate::core::field::FieldValue::String(self.name.clone())),
                    "status" => Some($crate::core::field::FieldValue::String(
                        self.status.as_str().to_string(),
                    )),
                    "created_at" => Some($crate::core::field::FieldValue::DateTime(self.created_at)),
                    $( stringify!($specific_field) => Some(self.$specific_field.to_field_value()), )*
                    _ => None,
                }
            }
        }

        impl $type {
            /// Create a new instance of this entity
            #[allow(clippy::too_many_arguments)]
            pub fn new(
                name: String,
                status: $status_type,
                $( $specific_field: $specific_type ),*
            ) -> Self {
                let now = ::chrono::Utc::now();
                Self {
                    id: ::uuid::Uuid::new_v4(),
                    entity_type: $type_name.to_string(),
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                    status,
                    name,
                    $( $specific_field ),*
                }
            }

            /// Soft delete this entity (sets deleted_at timestamp)
            pub fn soft_delete(&mut self) {
                self.deleted_at = Some(::chrono::Utc::now());
                self.touch();
            }

            /// Restore a soft-deleted entity
            pub fn restore(&mut self) {
                self.deleted_at = None;
                self.touch();
            }

            /// Update the updated_at timestamp to now
            pub fn touch(&mut self) {
                self.updated_at = ::chrono::Utc::now();
            }

            pub fn set_status(&mut self, status: $status_type) {
                self.status = status;
                self.touch();
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::entity::{Data, Entity};
    use crate::core::field::FieldValue;
    use uuid::Uuid;

    crate::string_enum!(WidgetStatus {
        Active => "active",
        Archived => "archived",
    });

    crate::impl_data_entity!(Widget, "widget", "widgets", WidgetStatus, ["name", "owner_id"], {
        owner_id: Uuid,
        #[serde(default)]
        note: Option<String>,
    });

    #[test]
    fn test_string_enum_round_trips_text() {
        assert_eq!(WidgetStatus::Archived.as_str(), "archived");
        assert_eq!("active".parse::<WidgetStatus>(), Ok(WidgetStatus::Active));
        assert!("gone".parse::<WidgetStatus>().is_err());
        assert_eq!(WidgetStatus::ALL.len(), 2);
    }

    #[test]
    fn test_generated_entity_metadata() {
        let owner = Uuid::new_v4();
        let widget = Widget::new("Bracket".to_string(), WidgetStatus::Active, owner, None);

        assert_eq!(Widget::resource_name(), "widgets");
        assert_eq!(widget.entity_type(), "widget");
        assert_eq!(widget.status(), "active");
        assert_eq!(widget.field_value("owner_id"), Some(FieldValue::Uuid(owner)));
        assert_eq!(widget.field_value("note"), Some(FieldValue::Null));
        assert_eq!(widget.field_value("missing"), None);
    }

    #[test]
    fn test_soft_delete_and_restore() {
        let mut widget = Widget::new("Bracket".to_string(), WidgetStatus::Active, Uuid::new_v4(), None);
        widget.soft_delete();
        assert!(widget.is_deleted());
        widget.restore();
        assert!(!widget.is_deleted());
        widget.set_status(WidgetStatus::Archived);
        assert_eq!(widget.status, WidgetStatus::Archived);
    }
}
