//! brt-hdlc エラー型

/// 受信フレームを破棄した理由
///
/// どちらのエラーもリンクにとって致命的ではない。
/// デコーダは次の FLAG で自動的に再同期する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// CRC 不一致（フレーム末尾 2 バイトと再計算値が異なる）
    CrcMismatch {
        /// ペイロードから再計算した CRC
        expected: u16,
        /// フレーム末尾に載っていた CRC（リトルエンディアン）
        received: u16,
    },
    /// 蓄積バッファを超える長さのフレーム
    Oversize {
        /// 蓄積バッファの容量（バイト）
        capacity: usize,
    },
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FrameError::CrcMismatch { expected, received } => write!(
                f,
                "Frame CRC mismatch (expected {:#06x}, received {:#06x})",
                expected, received
            ),
            FrameError::Oversize { capacity } => {
                write!(f, "Frame exceeds accumulation buffer ({} bytes)", capacity)
            }
        }
    }
}
