pub mod order;

pub use order::{
    money, Order, OrderAuthor, OrderLine, OrderScope, OrderStatus, PaymentProof, StatusMetadata,
    TrackingInfo, TrackingStatus,
};
