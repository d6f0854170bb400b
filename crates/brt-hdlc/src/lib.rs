//! # brt-hdlc
//!
//! BRT（Border Router Transport）のフレーミング層。
//!
//! シリアル回線上の連続したバイト列に、フラグバイトで区切られたパケットを載せる
//! HDLC 風のバイトスタッフィングを実装する。
//!
//! ## Frame の Wire Format
//!
//! ```text
//! [FLAG 0x7E][escaped(payload...)][escaped(crc_lo)][escaped(crc_hi)][FLAG 0x7E]
//!
//! escaped(b):
//!   b == 0x7E || b == 0x7D  → [0x7D][b ^ 0x20]
//!   それ以外                → [b]
//!
//! crc: CRC-16/X25（初期値 0xFFFF、ビット反転で確定）
//!      エスケープ前のペイロードのみを対象に計算する
//! ```
//!
//! ## 受信側の再同期
//!
//! デコーダはステートレスなベストエフォート転送を前提にしている。
//! CRC 不一致・サイズ超過のフレームは破棄し、次の FLAG で必ず同期し直す。
//! 再送・フロー制御は上位レイヤーの責任。

#![no_std]
extern crate alloc;

pub mod decoder;
pub mod encoder;
pub mod error;

pub use decoder::{DecoderState, FrameDecoder};
pub use encoder::{ByteSink, FrameEncoder};
pub use error::FrameError;

/// フレーム区切りバイト
pub const FLAG: u8 = 0x7E;

/// エスケープバイト
pub const ESCAPE: u8 = 0x7D;

/// エスケープ後のバイトに XOR するマスク
pub const ESCAPE_MASK: u8 = 0x20;

/// フレーム末尾の CRC のバイト数
pub const CRC_LEN: usize = 2;

/// 受信側の蓄積バッファ長（ペイロード + CRC、エスケープ解除後）
pub const MAX_FRAME_SIZE: usize = 200;

/// 1 フレームに載せられるペイロードの最大長
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - CRC_LEN;

/// FLAG / ESCAPE のどちらかで、エスケープが必要なバイトか
#[inline]
pub fn needs_escape(byte: u8) -> bool {
    byte == FLAG || byte == ESCAPE
}

/// ペイロードをエンコードしたときの最悪ケースのバイト数
///
/// 全バイト（ペイロード + CRC）がエスケープされ、前後に FLAG が付く場合。
pub const fn max_encoded_len(payload_len: usize) -> usize {
    2 + 2 * (payload_len + CRC_LEN)
}
