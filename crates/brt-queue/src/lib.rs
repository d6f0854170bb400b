//! # brt-queue
//!
//! 割り込みコンテキストとタスクコンテキストの間でバイトを受け渡すリングバッファ。
//!
//! ## 設計
//!
//! ```text
//! storage: [u8; N]   read ──► 取り出し位置   write ──► 書き込み位置
//!
//! len = (write - read) mod N
//! read == write        → 空
//! (write + 1) mod N == read → 満杯（1 スロットは空/満杯の区別用に使わない）
//! ```
//!
//! 実効容量は `N - 1` バイト。サイズは生成時に固定され、再確保はしない。
//!
//! ## 排他
//!
//! この型自体はロックを持たない（`&mut self` で操作する）。
//! 生産者と消費者が別コンテキストの場合、呼び出し側が排他区間
//! （`brt-link` では `critical_section::with`）で包み、インデックス更新と 1 バイトのコピーを
//! 不可分にすること。

#![no_std]

/// 固定長のバイトリングバッファ（単一生産者・単一消費者）
#[derive(Debug, Clone)]
pub struct ByteQueue<const N: usize> {
    storage: [u8; N],
    /// 次に取り出す位置
    read: usize,
    /// 次に書き込む位置
    write: usize,
}

impl<const N: usize> ByteQueue<N> {
    const VALID_SIZE: () = assert!(N >= 2, "ByteQueue needs at least two slots");

    /// 空のキューを生成する（`static` 初期化にも使える）
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_SIZE;
        ByteQueue {
            storage: [0u8; N],
            read: 0,
            write: 0,
        }
    }

    /// 格納できる最大バイト数（`N - 1`）
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// 格納中のバイト数
    pub fn len(&self) -> usize {
        (self.write + N - self.read) % N
    }

    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    pub fn is_full(&self) -> bool {
        (self.write + 1) % N == self.read
    }

    /// 空き容量
    pub fn free(&self) -> usize {
        self.capacity() - self.len()
    }

    /// 末尾に 1 バイト積む
    ///
    /// # 戻り値
    /// - `Ok(())`: 格納した
    /// - `Err(byte)`: 満杯のため格納できなかった（バイトをそのまま返す）
    pub fn push(&mut self, byte: u8) -> Result<(), u8> {
        let next = (self.write + 1) % N;
        if next == self.read {
            return Err(byte);
        }
        self.storage[self.write] = byte;
        self.write = next;
        Ok(())
    }

    /// 先頭から 1 バイト取り出す（空なら `None`）
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.storage[self.read];
        self.read = (self.read + 1) % N;
        Some(byte)
    }

    /// 先頭のバイトを取り出さずに参照する
    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.storage[self.read])
        }
    }

    /// `out` が埋まるかキューが空になるまで取り出し、取り出したバイト数を返す
    pub fn pop_into(&mut self, out: &mut [u8]) -> usize {
        let mut count = 0;
        for slot in out.iter_mut() {
            match self.pop() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        count
    }

    /// すべて破棄して空にする
    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
    }
}

impl<const N: usize> Default for ByteQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
