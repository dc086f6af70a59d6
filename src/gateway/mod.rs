//! Everything that touches the hosted payment gateway: the shared signing
//! routine, the outbound payment intent and the inbound notification.

pub mod checkout;
pub mod notification;
pub mod signature;
