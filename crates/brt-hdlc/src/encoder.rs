//! フレームエンコーダ
//!
//! ペイロードを FLAG で区切り、エスケープし、CRC を付けたバイト列に変換する。
//! 出力先は [`ByteSink`] で、1 バイトずつ書き込む（エンコーダ自身はバッファを持たない）。

use alloc::vec::Vec;

use brt_crc::Crc16;

use crate::{needs_escape, ESCAPE, ESCAPE_MASK, FLAG};

/// エンコード済みバイトの書き込み先
///
/// `brt-link` では送信パス（UART 直接書き込み or 送信キュー）がこれを実装する。
pub trait ByteSink {
    /// 1 バイト書き込む（失敗は書き込み先の責任で扱う）
    fn put(&mut self, byte: u8);
}

impl ByteSink for Vec<u8> {
    fn put(&mut self, byte: u8) {
        self.push(byte);
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn put(&mut self, byte: u8) {
        (**self).put(byte);
    }
}

/// HDLC 風フレームエンコーダ
///
/// ```text
/// begin()   → FLAG
/// push(b)   → CRC 更新（エスケープ前の値）→ escaped(b)
/// finish()  → escaped(crc_lo), escaped(crc_hi), FLAG
/// ```
///
/// ペイロードが複数のスライスに分かれていても、`push_slice` を繰り返せば
/// 1 フレームとしてエンコードできる。
pub struct FrameEncoder<S: ByteSink> {
    sink: S,
    crc: Crc16,
}

impl<S: ByteSink> FrameEncoder<S> {
    /// 開き FLAG を書き込み、新しいフレームを始める
    pub fn begin(mut sink: S) -> Self {
        sink.put(FLAG);
        FrameEncoder {
            sink,
            crc: Crc16::new(),
        }
    }

    /// ペイロードを 1 バイト追加する
    pub fn push(&mut self, byte: u8) {
        self.crc.update(byte);
        self.put_escaped(byte);
    }

    /// ペイロードをまとめて追加する
    pub fn push_slice(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    /// CRC（下位, 上位）と閉じ FLAG を書き込み、書き込み先を返す
    ///
    /// CRC バイト自体は CRC 計算に含めない。
    pub fn finish(mut self) -> S {
        let [lo, hi] = self.crc.finalize_bytes();
        self.put_escaped(lo);
        self.put_escaped(hi);
        self.sink.put(FLAG);
        self.sink
    }

    /// ペイロード 1 つを 1 フレームとして書き込む
    pub fn encode(payload: &[u8], sink: S) -> S {
        let mut encoder = FrameEncoder::begin(sink);
        encoder.push_slice(payload);
        encoder.finish()
    }

    fn put_escaped(&mut self, byte: u8) {
        if needs_escape(byte) {
            self.sink.put(ESCAPE);
            self.sink.put(byte ^ ESCAPE_MASK);
        } else {
            self.sink.put(byte);
        }
    }
}

impl FrameEncoder<Vec<u8>> {
    /// ペイロードをエンコードしたワイヤバイト列を返す
    pub fn encode_to_vec(payload: &[u8]) -> Vec<u8> {
        let buf = Vec::with_capacity(crate::max_encoded_len(payload.len()));
        FrameEncoder::encode(payload, buf)
    }
}
