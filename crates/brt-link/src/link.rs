//! リンクドライバ本体
//!
//! 1 本の物理チャネルにつき 1 つの [`Link`] を生成し、参照で共有する。
//! 割り込みハンドラとタスクの両方から `&Link` で呼び出せる。
//! 割り込みと共有する状態は `critical_section::Mutex<RefCell<_>>` に置き、
//! クリティカルセクションの中でだけ借用する。

use core::cell::RefCell;

use critical_section::Mutex;

use brt_hdlc::{ByteSink, FrameDecoder, FrameEncoder, FrameError, MAX_FRAME_SIZE};
use brt_queue::ByteQueue;

use crate::device::SerialDevice;
use crate::error::ReceiveError;
use crate::stats::LinkStats;
use crate::{LinkConfig, INPUT_QUEUE_SIZE, OUTPUT_QUEUE_SIZE};

/// 送信側の状態（タスクと送信完了割り込みの両方が更新する）
///
/// 不変条件: `busy == false` のとき `queue` は空
struct Transmitter<const OUT: usize> {
    /// 送信バーストが進行中
    busy: bool,
    /// `SerialDevice::write_byte` を呼び出している最中
    writing: bool,
    /// `write_byte` の最中に届いた送信完了通知
    completion_pending: bool,
    queue: ByteQueue<OUT>,
    frames_sent: u32,
    dropped: u32,
}

/// `Transmitter::submit` の結果
enum Submit {
    /// 呼び出し側がデバイスに直接書き込む
    Write,
    Queued,
    Dropped,
}

impl<const OUT: usize> Transmitter<OUT> {
    const fn new() -> Self {
        Transmitter {
            busy: false,
            writing: false,
            completion_pending: false,
            queue: ByteQueue::new(),
            frames_sent: 0,
            dropped: 0,
        }
    }

    fn submit(&mut self, byte: u8) -> Submit {
        if !self.busy {
            // バーストの先頭は同期的に書き込み、以降は割り込みごとに 1 バイトずつ
            self.busy = true;
            self.writing = true;
            return Submit::Write;
        }
        if self.queue.push(byte).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            return Submit::Dropped;
        }
        Submit::Queued
    }

    /// 送信完了通知を受け、次に書き込むバイトを返す
    ///
    /// 書き込み中の通知は保留し、書き込んでいる側に次のバイトを任せる。
    fn transmit_complete(&mut self) -> Option<u8> {
        if self.writing {
            self.completion_pending = true;
            return None;
        }
        self.next_byte()
    }

    /// `write_byte` が戻った後に呼ぶ。保留中の送信完了があれば次に書き込むバイトを返す
    fn write_done(&mut self) -> Option<u8> {
        if core::mem::take(&mut self.completion_pending) {
            return self.next_byte();
        }
        self.writing = false;
        None
    }

    fn next_byte(&mut self) -> Option<u8> {
        match self.queue.pop() {
            Some(byte) => {
                self.writing = true;
                Some(byte)
            }
            None => {
                self.busy = false;
                self.writing = false;
                None
            }
        }
    }

    fn clear(&mut self) {
        self.busy = false;
        self.writing = false;
        self.completion_pending = false;
        self.queue.clear();
    }
}

/// 受信キュー（受信割り込みが生産者、タスクが消費者）
struct Inbound<const IN: usize> {
    queue: ByteQueue<IN>,
    dropped: u32,
}

/// 受信タスク専用の状態（割り込みからは触らない）
struct Receiver<const F: usize> {
    decoder: FrameDecoder<F>,
    counters: RxCounters,
}

struct RxCounters {
    frames_received: u32,
    crc_errors: u32,
    oversize_frames: u32,
    buffer_too_small: u32,
}

impl RxCounters {
    fn record_drop(&mut self, e: &FrameError) {
        match e {
            FrameError::CrcMismatch { .. } => {
                self.crc_errors = self.crc_errors.saturating_add(1);
            }
            FrameError::Oversize { .. } => {
                self.oversize_frames = self.oversize_frames.saturating_add(1);
            }
        }
    }
}

/// エンコーダの出力を 1 バイトずつ送信パスに流すアダプタ
struct TransmitSink<'a, D, const IN: usize, const OUT: usize, const F: usize> {
    link: &'a Link<D, IN, OUT, F>,
}

impl<D: SerialDevice, const IN: usize, const OUT: usize, const F: usize> ByteSink
    for TransmitSink<'_, D, IN, OUT, F>
{
    fn put(&mut self, byte: u8) {
        self.link.submit_byte(byte);
    }
}

/// BRT リンク
///
/// 型パラメータ:
/// - `D`: シリアルデバイス
/// - `IN` / `OUT`: 受信・送信キューのスロット数
/// - `F`: 受信フレームの蓄積バッファ長（ペイロード + CRC）
///
/// `SerialDevice::write_byte` は送信・受信の状態を借用していない間に呼ぶので、
/// デバイスがその中から `on_transmit_complete` / `on_byte_received` を呼んでもよい。
///
/// ```
/// use brt_link::{CaptureDevice, Link, LinkConfig};
///
/// let link: Link<CaptureDevice> = Link::new(CaptureDevice::new(), LinkConfig::default());
/// link.init();
/// link.send(b"ping");
/// while link.is_busy() {
///     link.on_transmit_complete();
/// }
/// let wire = link.with_device(|d| d.take_written());
/// assert_eq!(wire.first(), Some(&0x7E));
/// ```
pub struct Link<
    D,
    const IN: usize = INPUT_QUEUE_SIZE,
    const OUT: usize = OUTPUT_QUEUE_SIZE,
    const F: usize = MAX_FRAME_SIZE,
> {
    device: Mutex<RefCell<D>>,
    transmitter: Mutex<RefCell<Transmitter<OUT>>>,
    inbound: Mutex<RefCell<Inbound<IN>>>,
    receiver: spin::Mutex<Receiver<F>>,
    config: LinkConfig,
}

impl<D: SerialDevice, const IN: usize, const OUT: usize, const F: usize> Link<D, IN, OUT, F> {
    /// リンクを生成する（`static` にも置ける）
    ///
    /// デバイスはまだ起動しない。`init()` を呼ぶこと。
    pub const fn new(device: D, config: LinkConfig) -> Self {
        Link {
            device: Mutex::new(RefCell::new(device)),
            transmitter: Mutex::new(RefCell::new(Transmitter::new())),
            inbound: Mutex::new(RefCell::new(Inbound {
                queue: ByteQueue::new(),
                dropped: 0,
            })),
            receiver: spin::Mutex::new(Receiver {
                decoder: FrameDecoder::new(),
                counters: RxCounters {
                    frames_received: 0,
                    crc_errors: 0,
                    oversize_frames: 0,
                    buffer_too_small: 0,
                },
            }),
            config,
        }
    }

    /// キューとデコーダを初期化し、デバイスを起動する
    pub fn init(&self) {
        self.with_inbound(|inbound| inbound.queue.clear());
        self.with_transmitter(|tx| tx.clear());
        self.receiver.lock().decoder.reset();
        self.with_device(|device| device.init());
        log::debug!("brt: link initialized");
    }

    /// デバイスを停止し、キューとデコーダを初期化する
    pub fn deinit(&self) {
        self.with_device(|device| device.deinit());
        self.with_transmitter(|tx| tx.clear());
        self.with_inbound(|inbound| inbound.queue.clear());
        self.receiver.lock().decoder.reset();
        log::debug!("brt: link deinitialized");
    }

    /// ペイロードを 1 フレームとして送信する
    ///
    /// 送信キューが満杯になった分のバイトは黙って捨てる（呼び出し側への通知はない）。
    pub fn send(&self, payload: &[u8]) {
        FrameEncoder::encode(payload, TransmitSink { link: self });
        self.with_transmitter(|tx| tx.frames_sent = tx.frames_sent.saturating_add(1));
    }

    /// 受信済みのバイトから CRC 検証済みのフレームを 1 つ取り出す
    ///
    /// # 戻り値
    /// - フレームのペイロード長（`out` の先頭にコピー済み）
    /// - `0`: 完成したフレームがない、またはフレームを失った
    ///   （`out` より大きいフレームは失われる）
    ///
    /// ブロックしない。CRC 不一致・サイズ超過のフレームは読み飛ばして受信キューを読み続ける。
    pub fn receive(&self, out: &mut [u8]) -> usize {
        loop {
            match self.try_receive(out) {
                Ok(Some(len)) => return len,
                Ok(None) => return 0,
                Err(ReceiveError::BufferTooSmall { .. }) => return 0,
                Err(ReceiveError::Frame(_)) => continue,
            }
        }
    }

    /// `receive` の診断版。フレームを破棄した時点でその理由を返す
    ///
    /// # 戻り値
    /// - `Ok(Some(len))`: フレームを `out` にコピーした
    /// - `Ok(None)`: 受信キューが空になった（フレーム未完成）、または別の呼び出しが受信中
    /// - `Err(ReceiveError)`: フレームを 1 つ破棄した（受信キューの残りは次回に処理する）
    pub fn try_receive(&self, out: &mut [u8]) -> Result<Option<usize>, ReceiveError> {
        let Some(mut guard) = self.receiver.try_lock() else {
            return Ok(None);
        };
        let receiver = &mut *guard;

        loop {
            let Some(byte) = self.with_inbound(|inbound| inbound.queue.pop()) else {
                return Ok(None);
            };

            match receiver.decoder.push(byte) {
                Ok(None) => {}
                Ok(Some(payload)) => {
                    let frame_len = payload.len();
                    if frame_len > out.len() {
                        receiver.counters.buffer_too_small =
                            receiver.counters.buffer_too_small.saturating_add(1);
                        log::warn!(
                            "brt: {} bytes frame lost, receive buffer is {} bytes",
                            frame_len,
                            out.len()
                        );
                        return Err(ReceiveError::BufferTooSmall {
                            frame_len,
                            capacity: out.len(),
                        });
                    }
                    out[..frame_len].copy_from_slice(payload);
                    receiver.counters.frames_received =
                        receiver.counters.frames_received.saturating_add(1);
                    log::debug!("brt: frame received ({} bytes)", frame_len);
                    return Ok(Some(frame_len));
                }
                Err(e) => {
                    receiver.counters.record_drop(&e);
                    log::warn!("brt: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    /// フレーミングを通さずにバイト列をそのまま送信する（診断・ブートストラップ用）
    pub fn send_raw(&self, data: &[u8]) {
        for &byte in data {
            self.submit_byte(byte);
        }
    }

    /// 受信キューのバイトをフレーミングを通さずにそのまま読み出す
    ///
    /// # 戻り値
    /// `out` にコピーしたバイト数（`out` が埋まるかキューが空になるまで）
    pub fn receive_raw(&self, out: &mut [u8]) -> usize {
        let mut count = 0;
        for slot in out.iter_mut() {
            let Some(byte) = self.with_inbound(|inbound| inbound.queue.pop()) else {
                break;
            };
            *slot = byte;
            count += 1;
        }
        count
    }

    /// 送信パスに 1 バイト載せる
    ///
    /// 送信中でなければデバイスに直接書き込み、送信中なら送信キューに積む。
    pub fn submit_byte(&self, byte: u8) {
        match self.with_transmitter(|tx| tx.submit(byte)) {
            Submit::Write => self.write_through(byte),
            Submit::Queued => {}
            Submit::Dropped => {
                log::warn!("brt: outbound queue full, byte {:#04x} dropped", byte);
            }
        }
    }

    /// 送信バーストが進行中か
    pub fn is_busy(&self) -> bool {
        self.with_transmitter(|tx| tx.busy)
    }

    /// リンクレベルの復旧のためにデバイスリセットを要求する
    ///
    /// 設定された回数だけ空回りしてからリセットする（時間精度は問わない）。
    pub fn reset(&self) {
        log::info!(
            "brt: device reset requested (settle {} spins)",
            self.config.reset_settle_spins
        );
        for _ in 0..self.config.reset_settle_spins {
            core::hint::spin_loop();
        }
        self.with_device(|device| device.system_reset());
    }

    // ===== 割り込みコンテキストから呼ぶ通知 =====

    /// 「1 バイト送信完了」通知
    ///
    /// 送信キューから次の 1 バイトを書き込む。空なら送信バーストを終える。
    pub fn on_transmit_complete(&self) {
        if let Some(byte) = self.with_transmitter(|tx| tx.transmit_complete()) {
            self.write_through(byte);
        }
    }

    /// 「1 バイト受信」通知
    ///
    /// 受信キューが満杯ならそのバイトを捨てる（上位への背圧はない）。
    pub fn on_byte_received(&self, byte: u8) {
        self.with_inbound(|inbound| {
            if inbound.queue.push(byte).is_err() {
                inbound.dropped = inbound.dropped.saturating_add(1);
            }
        });
    }

    // ===== 診断・アクセサ =====

    /// 統計情報のスナップショット
    pub fn stats(&self) -> LinkStats {
        let (frames_sent, tx_dropped) = self.with_transmitter(|tx| (tx.frames_sent, tx.dropped));
        let rx_dropped = self.with_inbound(|inbound| inbound.dropped);
        let receiver = self.receiver.lock();

        LinkStats {
            frames_sent,
            frames_received: receiver.counters.frames_received,
            crc_errors: receiver.counters.crc_errors,
            oversize_frames: receiver.counters.oversize_frames,
            buffer_too_small: receiver.counters.buffer_too_small,
            rx_dropped,
            tx_dropped,
        }
    }

    /// 受信キューに溜まっているバイト数
    pub fn pending_rx(&self) -> usize {
        self.with_inbound(|inbound| inbound.queue.len())
    }

    /// 送信キューに溜まっているバイト数
    pub fn pending_tx(&self) -> usize {
        self.with_transmitter(|tx| tx.queue.len())
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// クリティカルセクション内でデバイスを操作する
    ///
    /// `f` の中から同じリンクの `with_device` を呼んではいけない。
    pub fn with_device<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        critical_section::with(|cs| {
            let mut device = self.device.borrow(cs).borrow_mut();
            f(&mut *device)
        })
    }

    /// 排他的に借用できるときのデバイス参照（ロック不要）
    pub fn device_mut(&mut self) -> &mut D {
        self.device.get_mut().get_mut()
    }

    fn with_transmitter<R>(&self, f: impl FnOnce(&mut Transmitter<OUT>) -> R) -> R {
        critical_section::with(|cs| {
            let mut transmitter = self.transmitter.borrow(cs).borrow_mut();
            f(&mut *transmitter)
        })
    }

    fn with_inbound<R>(&self, f: impl FnOnce(&mut Inbound<IN>) -> R) -> R {
        critical_section::with(|cs| {
            let mut inbound = self.inbound.borrow(cs).borrow_mut();
            f(&mut *inbound)
        })
    }

    /// `first` をデバイスに書き込み、書き込み中に届いた送信完了の分も続けて書き込む
    fn write_through(&self, first: u8) {
        let mut next = Some(first);
        while let Some(byte) = next {
            self.with_device(|device| device.write_byte(byte));
            next = self.with_transmitter(|tx| tx.write_done());
        }
    }
}
