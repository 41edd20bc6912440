pub mod adapter;
pub mod cdp;

pub use adapter::CdpDomAdapter;
pub use cdp::CdpClient;
