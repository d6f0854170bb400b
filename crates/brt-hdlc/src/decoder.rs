//! フレームデコーダ
//!
//! 生のバイト列を 1 バイトずつ受け取り、FLAG で区切られたフレームを復元する状態機械。
//!
//! ## 状態遷移
//!
//! ```text
//! AwaitingFlag ── FLAG ──────────────────────────► Accumulating (fill = 0)
//!
//! Accumulating:
//!   FLAG, 直前の生バイト == FLAG  → fill = 0（連続 FLAG は新フレームの開始）
//!   FLAG, fill <= 2             → fill = 0（空/偽のフレーム開始）
//!   FLAG, fill >  2             → CRC 検証 → Ok(payload) / Err(CrcMismatch)
//!                                 いずれも閉じ FLAG を次フレームの開き FLAG とみなす
//!   ESCAPE                      → 次のデータバイトを ^ 0x20 して格納
//!   データ, バッファ満杯         → Err(Oversize), AwaitingFlag（残りは次の FLAG まで捨てる）
//!   データ                      → 格納
//! ```
//!
//! サイズ超過時は Accumulating に留まらず AwaitingFlag に戻す。残りのバイトは次の FLAG まで
//! 読み捨てるので、超過フレームの後半がたまたま CRC を通って別フレームとして受理されることはない。
//!
//! 「直前の生バイト」（連続 FLAG 判定用）と「ESCAPE を受けた直後か」（エスケープ解除用）は
//! 別々に保持する。

use brt_crc::Crc16;

use crate::error::FrameError;
use crate::{CRC_LEN, ESCAPE, ESCAPE_MASK, FLAG, MAX_FRAME_SIZE};

/// デコーダの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// フレーム外。FLAG 以外はすべて無視する
    AwaitingFlag,
    /// フレーム内。エスケープ解除したバイトを蓄積する
    Accumulating,
}

/// HDLC 風フレームデコーダ
///
/// `N` はエスケープ解除後のフレーム（ペイロード + CRC 2 バイト）の最大長。
/// リンクごとに 1 つ生成し、受信タスクのみが操作する。
#[derive(Debug, Clone)]
pub struct FrameDecoder<const N: usize = MAX_FRAME_SIZE> {
    state: DecoderState,
    buffer: [u8; N],
    /// 蓄積済みバイト数
    fill: usize,
    /// 直前に受け取った生バイト
    last_byte: u8,
    /// 直前のデータバイトが ESCAPE だった
    escape_pending: bool,
}

impl<const N: usize> FrameDecoder<N> {
    /// FLAG 待ち状態のデコーダを生成する
    pub const fn new() -> Self {
        FrameDecoder {
            state: DecoderState::AwaitingFlag,
            buffer: [0u8; N],
            fill: 0,
            last_byte: 0,
            escape_pending: false,
        }
    }

    /// 生バイトを 1 つ処理する
    ///
    /// # 戻り値
    /// - `Ok(Some(payload))`: CRC 検証済みのフレームが完成した（CRC 2 バイトは除く）
    /// - `Ok(None)`: まだフレームは完成していない
    /// - `Err(FrameError)`: 蓄積中のフレームを破棄した（次の FLAG で再同期する）
    pub fn push(&mut self, byte: u8) -> Result<Option<&[u8]>, FrameError> {
        let previous = core::mem::replace(&mut self.last_byte, byte);

        if self.state == DecoderState::AwaitingFlag {
            if byte == FLAG {
                self.restart();
            }
            return Ok(None);
        }

        if byte == FLAG {
            let len = self.fill;
            // 閉じ FLAG は次フレームの開き FLAG を兼ねる
            self.restart();
            if previous == FLAG || len <= CRC_LEN {
                return Ok(None);
            }
            return self.validate(len).map(Some);
        }

        if self.fill >= N {
            self.state = DecoderState::AwaitingFlag;
            self.fill = 0;
            self.escape_pending = false;
            return Err(FrameError::Oversize { capacity: N });
        }

        if byte == ESCAPE {
            self.escape_pending = true;
            return Ok(None);
        }

        let value = if core::mem::take(&mut self.escape_pending) {
            byte ^ ESCAPE_MASK
        } else {
            byte
        };
        self.buffer[self.fill] = value;
        self.fill += 1;
        Ok(None)
    }

    /// FLAG 待ち状態に戻す（蓄積中のデータは破棄）
    pub fn reset(&mut self) {
        self.state = DecoderState::AwaitingFlag;
        self.fill = 0;
        self.last_byte = 0;
        self.escape_pending = false;
    }

    /// 現在の状態
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// 蓄積中のバイト数（エスケープ解除後）
    pub fn fill(&self) -> usize {
        self.fill
    }

    /// 蓄積バッファの容量
    pub const fn capacity(&self) -> usize {
        N
    }

    fn restart(&mut self) {
        self.state = DecoderState::Accumulating;
        self.fill = 0;
        self.escape_pending = false;
    }

    /// 先頭 `len` バイトのフレームの CRC を検証し、ペイロードを返す
    fn validate(&self, len: usize) -> Result<&[u8], FrameError> {
        let (payload, trailer) = self.buffer[..len].split_at(len - CRC_LEN);
        let expected = Crc16::checksum(payload);
        let received = u16::from_le_bytes([trailer[0], trailer[1]]);
        if expected == received {
            Ok(payload)
        } else {
            Err(FrameError::CrcMismatch { expected, received })
        }
    }
}

impl<const N: usize> Default for FrameDecoder<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameEncoder;
    use alloc::vec::Vec;

    /// 結果をまとめて返す（Ok(Some) の中身は Vec にコピー）
    fn feed<const N: usize>(
        decoder: &mut FrameDecoder<N>,
        stream: &[u8],
    ) -> Vec<Result<Vec<u8>, FrameError>> {
        let mut events = Vec::new();
        for &b in stream {
            match decoder.push(b) {
                Ok(Some(payload)) => events.push(Ok(payload.to_vec())),
                Ok(None) => {}
                Err(e) => events.push(Err(e)),
            }
        }
        events
    }

    /// エスケープなしで CRC を付けた生フレーム（テスト用、CRC がエスケープ不要な場合のみ使う）
    fn raw_body(payload: &[u8]) -> Vec<u8> {
        let mut body = payload.to_vec();
        body.extend_from_slice(&Crc16::checksum(payload).to_le_bytes());
        body
    }

    #[test]
    fn test_ignores_bytes_before_flag() {
        let mut decoder = FrameDecoder::<16>::new();
        for b in [0x00u8, 0x7D, 0x41, 0xFF] {
            assert_eq!(decoder.push(b), Ok(None));
            assert_eq!(decoder.state(), DecoderState::AwaitingFlag);
        }
        assert_eq!(decoder.push(FLAG), Ok(None));
        assert_eq!(decoder.state(), DecoderState::Accumulating);
        assert_eq!(decoder.fill(), 0);
    }

    #[test]
    fn test_decodes_frame_byte_by_byte() {
        let mut decoder = FrameDecoder::<MAX_FRAME_SIZE>::new();
        let wire = FrameEncoder::encode_to_vec(&[0x01, 0x02, 0x7E, 0x03]);

        let (last, body) = wire.split_last().unwrap();
        for &b in body {
            assert_eq!(decoder.push(b), Ok(None));
        }
        assert_eq!(decoder.push(*last), Ok(Some(&[0x01u8, 0x02, 0x7E, 0x03][..])));

        // 閉じ FLAG の後は次のフレームを受け付ける状態
        assert_eq!(decoder.state(), DecoderState::Accumulating);
        assert_eq!(decoder.fill(), 0);
    }

    #[test]
    fn test_short_frame_rearms() {
        let mut decoder = FrameDecoder::<16>::new();
        // FLAG, 2 バイト, FLAG → CRC 分しかないので偽のフレーム開始
        let events = feed(&mut decoder, &[FLAG, 0x12, 0x34, FLAG]);
        assert!(events.is_empty());
        assert_eq!(decoder.state(), DecoderState::Accumulating);
        assert_eq!(decoder.fill(), 0);

        // 直後に正しいフレームが続けば受け取れる（CRC 0xF550 はエスケープ不要）
        let mut stream = raw_body(&[0x55]);
        stream.push(FLAG);
        assert_eq!(feed(&mut decoder, &stream), alloc::vec![Ok(alloc::vec![0x55])]);
    }

    #[test]
    fn test_repeated_flag_starts_fresh_frame() {
        let mut decoder = FrameDecoder::<MAX_FRAME_SIZE>::new();
        let good = FrameEncoder::encode_to_vec(b"ok");

        // 途中まで受信したところで FLAG が 2 連続 → 途中のデータは捨てて次へ
        let mut stream = alloc::vec![FLAG, 0x10, 0x20, FLAG, FLAG];
        stream.extend_from_slice(&good);
        let events = feed(&mut decoder, &stream);

        assert_eq!(events, alloc::vec![Ok(b"ok".to_vec())]);
    }

    #[test]
    fn test_many_flags_between_frames() {
        let mut decoder = FrameDecoder::<MAX_FRAME_SIZE>::new();
        let mut stream = FrameEncoder::encode_to_vec(b"one");
        stream.extend_from_slice(&[FLAG; 5]);
        stream.extend(FrameEncoder::encode_to_vec(b"two"));

        assert_eq!(
            feed(&mut decoder, &stream),
            alloc::vec![Ok(b"one".to_vec()), Ok(b"two".to_vec())]
        );
    }

    #[test]
    fn test_crc_mismatch_reports_values() {
        let mut decoder = FrameDecoder::<16>::new();
        let events = feed(&mut decoder, &[FLAG, 0x01, 0x02, 0x03, 0x00, 0x00, FLAG]);

        let expected = Crc16::checksum(&[0x01, 0x02, 0x03]);
        assert_eq!(
            events,
            alloc::vec![Err(FrameError::CrcMismatch { expected, received: 0x0000 })]
        );
        // 破棄後も受信は続けられる
        assert_eq!(decoder.state(), DecoderState::Accumulating);
    }

    #[test]
    fn test_oversize_frame_is_dropped_and_resyncs() {
        let mut decoder = FrameDecoder::<8>::new();

        // 容量 8 を超えるフレーム
        let big = FrameEncoder::encode_to_vec(&[0x11; 12]);
        let small = FrameEncoder::encode_to_vec(&[0x22; 3]);
        let mut stream = big;
        stream.extend_from_slice(&small);

        let events = feed(&mut decoder, &stream);
        assert_eq!(
            events,
            alloc::vec![Err(FrameError::Oversize { capacity: 8 }), Ok(alloc::vec![0x22; 3])]
        );
    }

    #[test]
    fn test_oversize_tail_is_not_accepted_as_frame() {
        let mut decoder = FrameDecoder::<8>::new();

        // 超過した後半だけを見ると CRC の通るフレームになっている
        let tail = FrameEncoder::encode_to_vec(&[0x33, 0x44]);
        let mut stream = alloc::vec![FLAG];
        stream.extend_from_slice(&[0x11; 9]);
        stream.extend_from_slice(&tail[1..]);
        stream.extend(FrameEncoder::encode_to_vec(&[0x55]));

        let events = feed(&mut decoder, &stream);
        assert_eq!(
            events,
            alloc::vec![Err(FrameError::Oversize { capacity: 8 }), Ok(alloc::vec![0x55])]
        );
    }

    #[test]
    fn test_exactly_full_frame_is_accepted() {
        // ペイロード 6 + CRC 2 = 8 でちょうど満杯
        let mut decoder = FrameDecoder::<8>::new();
        let payload = [0x30u8, 0x31, 0x32, 0x33, 0x34, 0x35];
        let wire = FrameEncoder::encode_to_vec(&payload);
        assert_eq!(feed(&mut decoder, &wire), alloc::vec![Ok(payload.to_vec())]);
    }

    #[test]
    fn test_escape_then_flag_does_not_leak_into_next_frame() {
        let mut decoder = FrameDecoder::<MAX_FRAME_SIZE>::new();
        // ESCAPE の直後に FLAG（壊れたフレーム）→ 次のフレームにエスケープ状態を持ち越さない
        let mut stream = alloc::vec![FLAG, 0x01, 0x02, 0x03, ESCAPE, FLAG];
        stream.extend(FrameEncoder::encode_to_vec(&[0x5E, 0x5D]));
        let events = feed(&mut decoder, &stream);

        assert_eq!(events.last(), Some(&Ok(alloc::vec![0x5E, 0x5D])));
    }

    #[test]
    fn test_reset_returns_to_awaiting_flag() {
        let mut decoder = FrameDecoder::<16>::new();
        feed(&mut decoder, &[FLAG, 0x01, 0x02]);
        assert_eq!(decoder.fill(), 2);

        decoder.reset();
        assert_eq!(decoder.state(), DecoderState::AwaitingFlag);
        assert_eq!(decoder.fill(), 0);
        assert_eq!(decoder.capacity(), 16);
    }
}
