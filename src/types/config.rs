use crate::h2::consts::{DEFAULT_HEADER_TABLE_SIZE, DEFAULT_MAX_FRAME_SIZE};
use crate::h2::framing::SettingsFrameBuilder;
use crate::h2::multiplexer::MultiplexerFactory;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub type PrefaceFn = Arc<dyn Fn() -> SettingsFrameBuilder + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerTimeouts {
    /// Bounds the TLS handshake plus the client preface read.
    pub handshake: Option<Duration>,
}

impl Default for ServerTimeouts {
    fn default() -> Self {
        Self {
            handshake: Some(Duration::from_secs(10)),
        }
    }
}

impl ServerTimeouts {
    pub fn disabled() -> Self {
        Self { handshake: None }
    }
}

#[derive(Clone)]
pub struct ServerConfig {
    pub address: String,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub timeouts: ServerTimeouts,
    /// Inbound frames declaring a larger payload are rejected before allocation.
    pub max_frame_size: u32,
    /// Upper bound for the HPACK dynamic table used to decode inbound header blocks.
    pub header_table_size: u32,
    /// Produces the SETTINGS frame sent as the server preface.
    pub preface: PrefaceFn,
    /// `None` selects the default multiplexer.
    pub multiplexer: Option<MultiplexerFactory>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:443".to_string(),
            cert_path: PathBuf::new(),
            key_path: PathBuf::new(),
            timeouts: ServerTimeouts::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            header_table_size: DEFAULT_HEADER_TABLE_SIZE,
            preface: Arc::new(SettingsFrameBuilder::new),
            multiplexer: None,
        }
    }
}

impl ServerConfig {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
            ..Self::default()
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_timeouts(mut self, timeouts: ServerTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Advertised in the server preface. Values outside `16384..=16777215`
    /// fail the preface build, so every connection is refused.
    pub fn with_max_frame_size(mut self, max_frame_size: u32) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_header_table_size(mut self, header_table_size: u32) -> Self {
        self.header_table_size = header_table_size;
        self
    }

    pub fn with_preface<F>(mut self, preface: F) -> Self
    where
        F: Fn() -> SettingsFrameBuilder + Send + Sync + 'static,
    {
        self.preface = Arc::new(preface);
        self
    }

    pub fn with_multiplexer(mut self, factory: MultiplexerFactory) -> Self {
        self.multiplexer = Some(factory);
        self
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("address", &self.address)
            .field("cert_path", &self.cert_path)
            .field("key_path", &self.key_path)
            .field("timeouts", &self.timeouts)
            .field("max_frame_size", &self.max_frame_size)
            .field("header_table_size", &self.header_table_size)
            .field("custom_multiplexer", &self.multiplexer.is_some())
            .finish_non_exhaustive()
    }
}
