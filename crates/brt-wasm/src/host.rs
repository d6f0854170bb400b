//! BrtHost wasm-bindgen エクスポート
//!
//! ホスト側のリンク端点。内部は `brt-link` の [`Link`] に [`CaptureDevice`] を
//! つないだもので、送信完了の通知は送信直後にまとめて行う。

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use brt_hdlc::{max_encoded_len, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
use brt_link::{CaptureDevice, Link, LinkConfig, LinkStats};

/// ホスト側の受信キュー長
///
/// `pushBytes` はシリアルポートの 1 チャンクをまとめて渡すため、組み込み側より大きくとる。
pub const HOST_INPUT_QUEUE_SIZE: usize = 4096;

/// ホスト側の送信キュー長（最悪ケースの 1 フレームが収まる）
pub const HOST_OUTPUT_QUEUE_SIZE: usize = max_encoded_len(MAX_PAYLOAD_SIZE) + 1;

type HostLink = Link<CaptureDevice, HOST_INPUT_QUEUE_SIZE, HOST_OUTPUT_QUEUE_SIZE, MAX_FRAME_SIZE>;

/// `getStats` が返す統計情報
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HostStats {
    #[serde(flatten)]
    pub link: LinkStats,
    /// 受信キューに残っているバイト数
    pub pending_rx: usize,
}

/// ホスト側の BRT 端点
///
/// WASM はシングルスレッドのため、JS からは単一スレッドで呼び出される前提。
#[wasm_bindgen]
pub struct BrtHost {
    link: HostLink,
}

#[wasm_bindgen]
impl BrtHost {
    #[wasm_bindgen(constructor)]
    pub fn new() -> BrtHost {
        let link: HostLink = Link::new(CaptureDevice::new(), LinkConfig::default());
        link.init();
        BrtHost { link }
    }

    /// ペイロードを 1 フレームにエンコードし、ワイヤに書くバイト列を返す
    ///
    /// # エラー
    /// - ペイロードが `maxPayloadSize()` を超える（相手側で必ず破棄される）
    #[wasm_bindgen(js_name = "encodeFrame")]
    pub fn encode_frame(&self, payload: &[u8]) -> Result<Vec<u8>, JsError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(JsError::new(&format!(
                "Payload too large: {} bytes (max {})",
                payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }
        self.link.send(payload);
        Ok(self.flush())
    }

    /// フレーミングを通さずに送るバイト列を返す（ブートローダとの対話用）
    #[wasm_bindgen(js_name = "encodeRaw")]
    pub fn encode_raw(&self, data: &[u8]) -> Vec<u8> {
        let mut wire = Vec::with_capacity(data.len());
        for chunk in data.chunks(HOST_OUTPUT_QUEUE_SIZE - 1) {
            self.link.send_raw(chunk);
            wire.extend(self.flush());
        }
        wire
    }

    /// シリアルポートから届いたバイトを受信キューに積む
    ///
    /// # 戻り値
    /// 受信キュー満杯で捨てたバイト数
    #[wasm_bindgen(js_name = "pushBytes")]
    pub fn push_bytes(&self, bytes: &[u8]) -> u32 {
        let before = self.link.stats().rx_dropped;
        for &b in bytes {
            self.link.on_byte_received(b);
        }
        self.link.stats().rx_dropped.wrapping_sub(before)
    }

    /// CRC 検証済みのフレームを 1 つ取り出す。なければ `undefined`
    #[wasm_bindgen(js_name = "nextFrame")]
    pub fn next_frame(&self) -> Option<Vec<u8>> {
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        match self.link.receive(&mut buf) {
            0 => None,
            len => Some(buf[..len].to_vec()),
        }
    }

    /// 完成しているフレームをすべて取り出す（`Uint8Array` の配列）
    #[wasm_bindgen(js_name = "drainFrames")]
    pub fn drain_frames(&self) -> js_sys::Array {
        let frames = js_sys::Array::new();
        while let Some(frame) = self.next_frame() {
            frames.push(&js_sys::Uint8Array::from(frame.as_slice()));
        }
        frames
    }

    /// 受信キューのバイトをフレーミングを通さずに読み出す
    #[wasm_bindgen(js_name = "readRaw")]
    pub fn read_raw(&self, max_len: usize) -> Vec<u8> {
        let mut buf = alloc::vec![0u8; max_len];
        let len = self.link.receive_raw(&mut buf);
        buf.truncate(len);
        buf
    }

    /// 統計情報を JSON 文字列で返す
    ///
    /// ```json
    /// {
    ///   "frames_sent": 3,
    ///   "frames_received": 2,
    ///   "crc_errors": 1,
    ///   "oversize_frames": 0,
    ///   "buffer_too_small": 0,
    ///   "rx_dropped": 0,
    ///   "tx_dropped": 0,
    ///   "pending_rx": 0
    /// }
    /// ```
    #[wasm_bindgen(js_name = "getStats")]
    pub fn get_stats(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.stats())
            .map_err(|e| JsError::new(&format!("Stats serialization failed: {}", e)))
    }
}

impl BrtHost {
    pub fn stats(&self) -> HostStats {
        HostStats {
            link: self.link.stats(),
            pending_rx: self.link.pending_rx(),
        }
    }

    /// 送信完了を通知し尽くして、デバイスに書かれたバイトを回収する
    fn flush(&self) -> Vec<u8> {
        while self.link.is_busy() {
            self.link.on_transmit_complete();
        }
        self.link.with_device(|d| d.take_written())
    }
}

impl Default for BrtHost {
    fn default() -> Self {
        Self::new()
    }
}
