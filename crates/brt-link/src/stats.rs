//! リンク診断カウンタ

/// リンクの統計情報（`Link::stats` のスナップショット）
///
/// `receive()` は「何も届いていない」と「届いたが捨てた」を区別しないため、
/// 破棄の内訳はここでのみ確認できる。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LinkStats {
    /// `send` でエンコードしたフレーム数
    pub frames_sent: u32,
    /// CRC 検証を通って呼び出し側に渡したフレーム数
    pub frames_received: u32,
    /// CRC 不一致で破棄したフレーム数
    pub crc_errors: u32,
    /// 蓄積バッファを超えて破棄したフレーム数
    pub oversize_frames: u32,
    /// 呼び出し側バッファが小さく失ったフレーム数
    pub buffer_too_small: u32,
    /// 受信キュー満杯で捨てたバイト数
    pub rx_dropped: u32,
    /// 送信キュー満杯で捨てたバイト数
    pub tx_dropped: u32,
}

impl LinkStats {
    /// 破棄したフレームの合計
    pub fn frames_dropped(&self) -> u32 {
        self.crc_errors
            .saturating_add(self.oversize_frames)
            .saturating_add(self.buffer_too_small)
    }
}
