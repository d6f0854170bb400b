//! # brt-crc
//!
//! BRT フレームの完全性チェックに使う CRC-16/X25（CCITT、LSB ファースト）。
//! `no_std` 環境（割り込みコンテキストを含む）で動作し、アロケーションはしない。
//!
//! ## パラメータ
//!
//! ```text
//! 生成多項式 : 0x1021（反転表現 0x8408 を LSB ファーストで適用）
//! 初期値     : 0xFFFF
//! 最終処理   : ビット反転（one's complement）
//! 残余       : 0xF0B8（データ + CRC 下位 + CRC 上位 を通した反転前の値）
//! ```
//!
//! 計算は `crc` クレートの `CRC_16_IBM_SDLC`（X25 と同一パラメータ）で行う。
//! ワイヤ上では CRC を下位バイト、上位バイトの順に送る。

#![no_std]

use crc::{Crc, Digest, CRC_16_IBM_SDLC};

/// CRC の初期値
pub const CRC_INIT: u16 = 0xFFFF;

/// 正しいフレーム（データ + 送信 CRC 2 バイト）を通したときの反転前の残余
///
/// 最終処理後の値では `!CRC_GOOD`（0x0F47）になる。
pub const CRC_GOOD: u16 = 0xF0B8;

/// CRC-16/X25 のアルゴリズム定義（テーブルはコンパイル時に生成される）
pub static X25: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// インクリメンタルな CRC-16/X25 アキュムレータ
///
/// 1 バイトずつ（エンコーダ・デコーダのバイト単位処理）でも、
/// バッファ単位でも更新できる。
#[derive(Clone)]
pub struct Crc16 {
    digest: Digest<'static, u16>,
}

impl Crc16 {
    /// 初期値 0xFFFF のアキュムレータを生成する
    pub fn new() -> Self {
        Crc16 {
            digest: X25.digest(),
        }
    }

    /// 1 バイト追加する
    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.digest.update(&[byte]);
    }

    /// バッファをまとめて追加する
    pub fn update_slice(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
    }

    /// 最終 CRC を返す（アキュムレータ自体は変更しない）
    pub fn finalize(&self) -> u16 {
        self.digest.clone().finalize()
    }

    /// 最終 CRC をワイヤ順（下位, 上位）のバイト列で返す
    pub fn finalize_bytes(&self) -> [u8; 2] {
        self.finalize().to_le_bytes()
    }

    /// スライス全体の CRC を計算する
    pub fn checksum(bytes: &[u8]) -> u16 {
        X25.checksum(bytes)
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

/// 1 バイト分 CRC を進める（純関数）
///
/// # 例
/// ```
/// let mut crc = brt_crc::Crc16::new();
/// for &b in b"123456789" {
///     crc = brt_crc::update(crc, b);
/// }
/// assert_eq!(brt_crc::finalize(&crc), 0x906E);
/// ```
#[inline]
pub fn update(mut state: Crc16, byte: u8) -> Crc16 {
    state.update(byte);
    state
}

/// 累積値を最終的な CRC に変換する（ビット反転）
#[inline]
pub fn finalize(state: &Crc16) -> u16 {
    state.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0x8408 を LSB ファーストで 1 ビットずつ適用する参照実装
    fn reference_update(mut crc: u16, byte: u8) -> u16 {
        crc ^= byte as u16;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0x8408
            } else {
                crc >> 1
            };
        }
        crc
    }

    fn reference_checksum(bytes: &[u8]) -> u16 {
        !bytes.iter().fold(CRC_INIT, |crc, &b| reference_update(crc, b))
    }

    #[test]
    fn test_reference_table_entries() {
        // 参照テーブル（fcstab）の先頭・中間・末尾
        let entry = |i: u8| reference_update(0, i);
        assert_eq!(entry(0x00), 0x0000);
        assert_eq!(entry(0x01), 0x1189);
        assert_eq!(entry(0x02), 0x2312);
        assert_eq!(entry(0x0F), 0xF8F7);
        assert_eq!(entry(0x80), 0x8408);
        assert_eq!(entry(0xFE), 0x1EF1);
        assert_eq!(entry(0xFF), 0x0F78);
    }

    #[test]
    fn test_matches_reference_for_every_byte() {
        for b in 0..=255u8 {
            assert_eq!(Crc16::checksum(&[b]), reference_checksum(&[b]), "byte {:#04x}", b);
            assert_eq!(
                Crc16::checksum(&[b, 0x7E, b ^ 0x5A]),
                reference_checksum(&[b, 0x7E, b ^ 0x5A])
            );
        }

        let long: [u8; 256] = core::array::from_fn(|i| i as u8);
        assert_eq!(Crc16::checksum(&long), reference_checksum(&long));
    }

    #[test]
    fn test_check_value() {
        // CRC-16/X25 の標準チェック値
        assert_eq!(Crc16::checksum(b"123456789"), 0x906E);
        assert_eq!(Crc16::checksum(&[0x01, 0x02, 0x7E, 0x03]), 0x0D92);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Crc16::checksum(&[]), !CRC_INIT);
        assert_eq!(Crc16::new().finalize(), 0x0000);
    }

    #[test]
    fn test_bytewise_equals_slice() {
        let data = [0x01u8, 0x02, 0x7E, 0x03];

        let mut bytewise = Crc16::new();
        for &b in &data {
            bytewise = update(bytewise, b);
        }

        let mut acc = Crc16::new();
        acc.update_slice(&data);

        assert_eq!(finalize(&bytewise), acc.finalize());
    }

    #[test]
    fn test_residue_over_data_and_crc() {
        let data = b"border router";
        let mut acc = Crc16::new();
        acc.update_slice(data);
        let [lo, hi] = acc.finalize_bytes();

        // 受信側は CRC 込みで計算すると固定の残余になる
        acc.update(lo);
        acc.update(hi);
        assert_eq!(acc.finalize(), !CRC_GOOD);
    }

    #[test]
    fn test_finalize_does_not_consume() {
        let mut acc = Crc16::new();
        acc.update(0x55);
        let first = acc.finalize();
        assert_eq!(first, 0xF550);
        assert_eq!(acc.finalize(), first);
        acc.update(0xAA);
        assert_ne!(acc.finalize(), first);
    }
}
