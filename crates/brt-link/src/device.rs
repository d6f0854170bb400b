//! シリアルデバイス抽象
//!
//! リンクドライバが使う外部デバイス（UART 等）の最小インタフェース。
//! デバイス側の割り込みハンドラは、登録された [`crate::Link`] に対して
//! `on_transmit_complete()` / `on_byte_received(byte)` を呼び出す。

use alloc::vec::Vec;

/// リンクドライバが操作するシリアルデバイス
///
/// `write_byte` はクリティカルセクション内から呼ばれるが、送信・受信の状態は借りていないので、
/// 中から `Link::on_transmit_complete` / `Link::on_byte_received` を呼んでもよい。
/// 1 度に送信中にできるのは 1 バイトだけで、送信完了は割り込みで
/// `Link::on_transmit_complete` に通知すること。
pub trait SerialDevice {
    /// デバイスを起動し、送受信の割り込みを有効にする
    fn init(&mut self) {}

    /// 割り込みを止め、デバイスを停止する
    fn deinit(&mut self) {}

    /// 1 バイト送信を開始する（完了を待たない）
    fn write_byte(&mut self, byte: u8);

    /// デバイス（またはシステム全体）のリセットを要求する
    fn system_reset(&mut self);
}

/// 書き込まれたバイトを記録するだけのデバイス
///
/// ホスト側（WASM バインディング）やテストで使う。
/// 送信完了の通知は呼び出し側が `Link::on_transmit_complete` で行う。
#[derive(Debug, Default, Clone)]
pub struct CaptureDevice {
    written: Vec<u8>,
    initialized: bool,
    resets: u32,
}

impl CaptureDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記録済みのバイトを取り出し、記録をクリアする
    pub fn take_written(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.written)
    }

    /// 記録済みのバイト
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// `init` 済みで `deinit` されていないか
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// `system_reset` が呼ばれた回数
    pub fn reset_count(&self) -> u32 {
        self.resets
    }
}

impl SerialDevice for CaptureDevice {
    fn init(&mut self) {
        self.initialized = true;
    }

    fn deinit(&mut self) {
        self.initialized = false;
    }

    fn write_byte(&mut self, byte: u8) {
        self.written.push(byte);
    }

    fn system_reset(&mut self) {
        self.resets += 1;
    }
}
