use crate::h2::consts::*;
use crate::types::{ErrorCode, Frame, H2Error, RawFrame, SettingsFrame};
use bytes::{BufMut, BytesMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsParam {
    pub id: u16,
    pub value: u32,
}

impl SettingsParam {
    pub fn new(id: u16, value: u32) -> Self {
        Self { id, value }
    }

    /// Ids `0` and anything above `SETTINGS_MAX_HEADER_LIST_SIZE` are unknown.
    pub fn is_unknown(&self) -> bool {
        self.id == 0 || self.id > SETTINGS_MAX_HEADER_LIST_SIZE
    }

    pub fn verify(&self) -> Result<(), H2Error> {
        match self.id {
            SETTINGS_ENABLE_PUSH if self.value > 1 => Err(H2Error::new(
                ErrorCode::ProtocolError,
                format!("enable push settings value is invalid({})", self.value),
            )),
            SETTINGS_INITIAL_WINDOW_SIZE if self.value > MAX_INITIAL_WINDOW_SIZE => {
                Err(H2Error::new(
                    ErrorCode::FlowControlError,
                    format!("initial window size settings value is invalid({})", self.value),
                ))
            }
            SETTINGS_MAX_FRAME_SIZE
                if !(MIN_MAX_FRAME_SIZE..=MAX_FRAME_SIZE_UPPER_BOUND).contains(&self.value) =>
            {
                Err(H2Error::new(
                    ErrorCode::FlowControlError,
                    format!("max frame size settings value is invalid({})", self.value),
                ))
            }
            _ => Ok(()),
        }
    }
}

fn ack_with_payload_error() -> H2Error {
    H2Error::new(
        ErrorCode::FrameSizeError,
        "ack settings frame's payload length must be 0",
    )
}

impl SettingsFrame {
    pub fn is_ack(&self) -> bool {
        self.0.has_flag(ACK_FLAG)
    }

    pub fn verify(&self) -> Result<(), H2Error> {
        if self.0.stream_id != 0 {
            return Err(H2Error::new(
                ErrorCode::ProtocolError,
                "settings frame's stream ID must be 0",
            ));
        }

        let len = self.0.payload.len();
        if self.is_ack() && len != 0 {
            return Err(ack_with_payload_error());
        }

        if len % SETTINGS_PARAM_SIZE != 0 {
            return Err(H2Error::new(
                ErrorCode::FrameSizeError,
                "settings frame's payload length is invalid",
            ));
        }

        Ok(())
    }

    /// Parameters in payload order. Unknown ids are dropped.
    pub fn params(&self) -> Vec<SettingsParam> {
        self.0
            .payload
            .chunks_exact(SETTINGS_PARAM_SIZE)
            .map(|record| SettingsParam {
                id: u16::from_be_bytes([record[0], record[1]]),
                value: u32::from_be_bytes([record[2], record[3], record[4], record[5]]),
            })
            .filter(|param| !param.is_unknown())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsFrameBuilder {
    ack: bool,
    params: Vec<SettingsParam>,
}

impl SettingsFrameBuilder {
    pub fn new() -> Self {
        Self {
            ack: false,
            params: Vec::with_capacity(6),
        }
    }

    pub fn ack(mut self) -> Self {
        self.ack = true;
        self
    }

    pub fn add(mut self, param: SettingsParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn set(self, id: u16, value: u32) -> Self {
        self.add(SettingsParam::new(id, value))
    }

    /// Like [`set`](Self::set), but drops earlier params with the same id.
    pub fn replace(mut self, id: u16, value: u32) -> Self {
        self.params.retain(|param| param.id != id);
        self.set(id, value)
    }

    pub fn build(self) -> Result<Frame, H2Error> {
        if self.ack && !self.params.is_empty() {
            return Err(ack_with_payload_error());
        }

        let mut payload = BytesMut::with_capacity(self.params.len() * SETTINGS_PARAM_SIZE);
        for param in &self.params {
            param
                .verify()
                .map_err(|e| H2Error::wrap(e.code(), "can't build settings frame", e))?;

            payload.put_u16(param.id);
            payload.put_u32(param.value);
        }

        let flags = if self.ack { ACK_FLAG } else { 0 };
        Ok(Frame::Settings(SettingsFrame(RawFrame::new(
            SETTINGS_FRAME_TYPE,
            flags,
            0,
            payload.freeze(),
        ))))
    }
}
