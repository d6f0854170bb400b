//! # brt-link
//!
//! BRT のリンクドライバ。シリアルデバイスの割り込み（1 バイト単位）と
//! アプリケーションのタスク（パケット単位）を 2 本のバイトキューでつなぐ。
//!
//! ## データの流れ
//!
//! ```text
//! 送信:
//!   send(payload) → FrameEncoder → submit_byte
//!     busy でなければ UART に直接書き込み（busy = true）
//!     busy なら送信キューへ
//!   on_transmit_complete() → 送信キューから 1 バイト書き込み / 空なら busy = false
//!
//! 受信:
//!   on_byte_received(b) → 受信キューへ（満杯なら捨てる）
//!   receive(buf) → 受信キューを FrameDecoder に流し、CRC 検証済みのフレームを 1 つ返す
//! ```
//!
//! ## コンテキストと排他
//!
//! - 割り込みコンテキスト: `on_transmit_complete`, `on_byte_received`
//! - タスクコンテキスト: `send`, `receive`, `send_raw`, `receive_raw`, `reset`, `is_busy`
//!
//! 割り込みと共有する状態（受信キュー、送信状態、デバイス）は
//! `critical_section::Mutex<RefCell<_>>` に置き、`critical_section::with` の中でだけ触る。
//! 割り込み側はスピンしないので、タスクが状態を借りている最中に割り込まれても止まらない。
//! `write_byte` 呼び出し中はデバイス以外の状態を借りていないため、デバイスが
//! その中から `on_transmit_complete` / `on_byte_received` を呼んでもよい。
//!
//! デコーダはタスクコンテキストだけが使うので `spin::Mutex` に置く。
//!
//! ## 信頼性
//!
//! フロー制御・再送・コネクション状態は持たない（1 フレームずつのベストエフォート）。
//! 破棄したフレームは `receive()` の戻り値には現れず、[`LinkStats`] にのみ記録される。

#![no_std]
extern crate alloc;

pub mod device;
pub mod error;
pub mod link;
pub mod stats;

pub use device::{CaptureDevice, SerialDevice};
pub use error::ReceiveError;
pub use link::Link;
pub use stats::LinkStats;

pub use brt_hdlc::{MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};

/// 受信キューのスロット数（実効容量は 1 少ない）
pub const INPUT_QUEUE_SIZE: usize = 512;

/// 送信キューのスロット数
/// 1 タイムスロット中に最悪フレーム 1 つとステータスフレーム 1 つを送れる大きさ
pub const OUTPUT_QUEUE_SIZE: usize = 256;

/// リセット前のビジーウェイト回数の既定値
pub const RESET_SETTLE_SPINS: u32 = 1_000_000;

/// リンクの実行時設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkConfig {
    /// `reset()` がデバイスリセットを要求するまでに空回りする回数
    pub reset_settle_spins: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            reset_settle_spins: RESET_SETTLE_SPINS,
        }
    }
}
