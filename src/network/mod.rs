//! Outbound transmission of impedance data

mod sender;

pub use sender::{format_as_json, DataSender, DataType, SenderError, DATA_TYPE_HEADER};
