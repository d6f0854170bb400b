//! brt-link エラー型

use brt_hdlc::FrameError;

/// `Link::try_receive` が破棄したフレームの理由
///
/// `Link::receive` はこれらをすべて「0 バイト」として扱う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveError {
    /// デコーダがフレームを破棄した（CRC 不一致・サイズ超過）
    Frame(FrameError),
    /// 呼び出し側のバッファが小さすぎてフレームを失った
    BufferTooSmall {
        /// 受信したペイロード長
        frame_len: usize,
        /// 呼び出し側バッファの長さ
        capacity: usize,
    },
}

impl From<FrameError> for ReceiveError {
    fn from(e: FrameError) -> Self {
        ReceiveError::Frame(e)
    }
}

impl core::fmt::Display for ReceiveError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReceiveError::Frame(e) => write!(f, "Frame dropped: {}", e),
            ReceiveError::BufferTooSmall { frame_len, capacity } => write!(
                f,
                "Receive buffer too small ({} bytes frame, {} bytes buffer)",
                frame_len, capacity
            ),
        }
    }
}
