//! # brt-wasm
//!
//! wasm-bindgen エクスポート：ホスト側（Node.js / ブラウザ）から BRT リンクを使う公開 API。
//!
//! ホスト側にはシリアル割り込みがないため、[`BrtHost`] はエンコード結果をそのまま返し、
//! 受信バイトはまとめて `pushBytes` で渡す。
//!
//! ## 使用方法（TypeScript）
//!
//! ```typescript
//! import { BrtHost, init_panic_hook } from '../brt-wasm-pkg/brt_wasm';
//!
//! init_panic_hook();
//! const host = new BrtHost();
//!
//! // 送信: フレームにしてシリアルポートへ
//! port.write(host.encodeFrame(payload));
//!
//! // 受信: 届いたバイトを渡し、完成したフレームを取り出す
//! port.on('data', (chunk) => {
//!     host.pushBytes(chunk);
//!     let frame;
//!     while ((frame = host.nextFrame()) !== undefined) {
//!         handle(frame);
//!     }
//! });
//!
//! console.log(JSON.parse(host.getStats()));
//! ```

extern crate alloc;

use wasm_bindgen::prelude::*;

pub mod host;

pub use host::{BrtHost, HostStats};

/// パニック時にブラウザコンソールにスタックトレースを出力する
///
/// 本番ビルドでは feature flag で無効化可能。
#[wasm_bindgen]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// 1 フレームに載せられるペイロードの最大長
#[wasm_bindgen(js_name = "maxPayloadSize")]
pub fn max_payload_size() -> usize {
    brt_hdlc::MAX_PAYLOAD_SIZE
}
