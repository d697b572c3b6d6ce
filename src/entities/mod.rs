//! Record types kept by the service
//!
//! Each module declares one entity with `impl_data_entity!`, its request
//! bodies and its [`Resource`](crate::core::Resource) binding.

pub mod macros;

pub mod appointment;
pub mod client;
pub mod device;
pub mod invoice;
pub mod lead;
pub mod payment;
pub mod service_item;
pub mod user;
pub mod vehicle;

pub use appointment::{Appointment, AppointmentKind, AppointmentStatus};
pub use client::{Client, ClientStatus};
pub use device::{Device, DeviceStatus};
pub use invoice::{Invoice, InvoiceStatus};
pub use lead::{Lead, LeadStatus};
pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use service_item::{ServiceItem, ServiceItemStatus, ServiceKind};
pub use user::{User, UserRole, UserStatus};
pub use vehicle::{Vehicle, VehicleStatus};

/// Display name for a person record
pub fn full_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_trims_parts() {
        assert_eq!(full_name(" Ada ", "Lovelace"), "Ada Lovelace");
        assert_eq!(full_name("", "Solo"), "Solo");
    }
}
