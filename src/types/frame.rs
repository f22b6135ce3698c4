use super::error::ServerError;
use crate::h2::consts::STREAM_ID_MASK;
use async_trait::async_trait;
use bytes::Bytes;

/// The part every HTTP/2 frame shares: 9-byte header fields plus the raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub(crate) frame_type: u8,
    pub(crate) flags: u8,
    pub(crate) stream_id: u32,
    pub(crate) payload: Bytes,
}

impl RawFrame {
    /// The reserved bit of `stream_id` is cleared.
    pub fn new(frame_type: u8, flags: u8, stream_id: u32, payload: Bytes) -> Self {
        Self {
            frame_type,
            flags,
            stream_id: stream_id & STREAM_ID_MASK,
            payload,
        }
    }

    pub fn frame_type(&self) -> u8 {
        self.frame_type
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn stream_id(&self) -> u32 {
        self.stream_id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub(crate) fn has_flag(&self, flag: u8) -> bool {
        (self.flags & flag) != 0
    }
}

macro_rules! frame_views {
    ($($(#[$doc:meta])* $variant:ident($view:ident)),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, PartialEq, Eq)]
            pub struct $view(pub(crate) RawFrame);

            impl $view {
                pub fn raw(&self) -> &RawFrame {
                    &self.0
                }

                pub fn into_raw(self) -> RawFrame {
                    self.0
                }
            }

            impl From<$view> for Frame {
                fn from(view: $view) -> Self {
                    Frame::$variant(view)
                }
            }
        )*

        /// A parsed or built frame. Priority and WindowUpdate are carried as
        /// `Unknown` and never rejected.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Frame {
            $($variant($view),)*
        }

        impl Frame {
            pub fn raw(&self) -> &RawFrame {
                match self {
                    $(Frame::$variant(view) => &view.0,)*
                }
            }

            pub fn into_raw(self) -> RawFrame {
                match self {
                    $(Frame::$variant(view) => view.0,)*
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Frame::$variant(_) => stringify!($variant),)*
                }
            }
        }
    };
}

frame_views! {
    Data(DataFrame),
    Headers(HeadersFrame),
    RstStream(RstStreamFrame),
    Settings(SettingsFrame),
    PushPromise(PushPromiseFrame),
    Ping(PingFrame),
    GoAway(GoAwayFrame),
    Continuation(ContinuationFrame),
    /// Any type code this server does not interpret.
    Unknown(UnknownFrame),
}

impl Frame {
    pub fn frame_type(&self) -> u8 {
        self.raw().frame_type
    }

    pub fn flags(&self) -> u8 {
        self.raw().flags
    }

    pub fn stream_id(&self) -> u32 {
        self.raw().stream_id
    }

    pub fn payload(&self) -> &Bytes {
        &self.raw().payload
    }
}

#[async_trait]
pub trait FrameSink {
    async fn write_frame(&mut self, frame: Frame) -> Result<(), ServerError>;
}
