//! cpal capture and playback. Each stream lives on its own thread so the
//! handles stay `Send` and never block an async caller.

use crate::audio::{wav_from_samples, wav_to_samples};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const RESAMPLE_CHUNK_SIZE: usize = 1024;
const PLAYBACK_POLL_INTERVAL: Duration = Duration::from_millis(20);

fn get_host() -> cpal::Host {
    cpal::default_host()
}

pub fn get_or_default_input(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());
    match device_name {
        None => host
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("No default input device")),
        Some(target) => host
            .input_devices()?
            .find(|d| d.name().is_ok_and(|name| name == target))
            .ok_or_else(|| anyhow::anyhow!("No target device found")),
    }
}

pub fn get_or_default_output(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();
    match device_name {
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No default output device")),
        Some(target) => host
            .output_devices()?
            .find(|d| d.name().is_ok_and(|name| name == target))
            .ok_or_else(|| anyhow::anyhow!("No target device found")),
    }
}

pub fn create_resampler(
    in_sampling_rate: f64,
    out_sampling_rate: f64,
    chunk_size: usize,
) -> anyhow::Result<FastFixedIn<f32>> {
    let resampler = FastFixedIn::<f32>::new(
        out_sampling_rate / in_sampling_rate,
        1.0,
        PolynomialDegree::Cubic,
        chunk_size,
        1,
    )?;
    Ok(resampler)
}

pub fn split_for_chunks(samples: &[f32], chunk_size: usize) -> Vec<Vec<f32>> {
    samples
        .chunks(chunk_size)
        .map(|chunk| {
            let mut chunk = chunk.to_vec();
            chunk.resize(chunk_size, 0.0);
            chunk
        })
        .collect()
}

/// Resamples a mono clip; the tail of the last chunk is zero padded.
pub fn resample(samples: &[f32], in_rate: u32, out_rate: u32) -> anyhow::Result<Vec<f32>> {
    if in_rate == out_rate {
        return Ok(samples.to_vec());
    }
    let mut resampler = create_resampler(in_rate as f64, out_rate as f64, RESAMPLE_CHUNK_SIZE)?;
    let mut out = Vec::with_capacity(samples.len() * out_rate as usize / in_rate as usize + 1);
    for chunk in split_for_chunks(samples, RESAMPLE_CHUNK_SIZE) {
        let resampled = resampler.process(&[chunk], None)?;
        if let Some(channel) = resampled.into_iter().next() {
            out.extend(channel);
        }
    }
    Ok(out)
}

fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// A wav clip playing on an output device.
pub struct PlaybackStream {
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackStream {
    /// Opens the output device and starts playing `wav`. Returns once the
    /// stream is running; malformed wav data and device failures are both
    /// reported here.
    pub fn start(device_name: Option<String>, wav: &[u8]) -> anyhow::Result<Self> {
        let (samples, spec) = wav_to_samples(wav)?;
        let mono = downmix(&samples, spec.channels as usize);
        let in_rate = spec.sample_rate;

        let stop = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<anyhow::Result<()>>();

        let thread_stop = stop.clone();
        let thread_finished = finished.clone();
        let handle = thread::spawn(move || {
            let stream = match open_output(device_name, mono, in_rate, &thread_finished) {
                Ok(stream) => stream,
                Err(e) => {
                    thread_finished.store(true, Ordering::SeqCst);
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));

            while !thread_stop.load(Ordering::SeqCst) && !thread_finished.load(Ordering::SeqCst) {
                thread::sleep(PLAYBACK_POLL_INTERVAL);
            }
            drop(stream);
            thread_finished.store(true, Ordering::SeqCst);
        });

        let mut playback = Self {
            stop,
            finished,
            handle: Some(handle),
        };
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(playback),
            Ok(Err(e)) => {
                playback.stop();
                Err(e)
            }
            Err(_) => {
                playback.stop();
                Err(anyhow::anyhow!("playback thread exited before the stream started"))
            }
        }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("playback thread panicked");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Drop for PlaybackStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_output(
    device_name: Option<String>,
    mono: Vec<f32>,
    in_rate: u32,
    finished: &Arc<AtomicBool>,
) -> anyhow::Result<cpal::Stream> {
    let device = get_or_default_output(device_name)?;
    let config = device.default_output_config()?;
    let out_rate = config.sample_rate().0;
    let out_channels = config.channels() as usize;
    let samples = resample(&mono, in_rate, out_rate)?;

    let buffer = HeapRb::<f32>::new(samples.len().max(1));
    let (mut producer, mut consumer) = buffer.split();
    producer.push_slice(&samples);

    let drained = finished.clone();
    let stream_config: StreamConfig = config.into();
    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(out_channels.max(1)) {
                let sample = consumer.try_pop().unwrap_or_else(|| {
                    drained.store(true, Ordering::SeqCst);
                    0.0
                });
                frame.fill(sample);
            }
        },
        move |err| tracing::error!("an error occurred on output stream: {}", err),
        None,
    )?;
    stream.play()?;
    Ok(stream)
}

/// Microphone recording into memory.
pub struct CaptureStream {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<anyhow::Result<Vec<u8>>>,
}

impl CaptureStream {
    /// Opens the input device and starts recording. Fails when the device is
    /// missing or access is denied.
    pub fn start(device_name: Option<String>) -> anyhow::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<anyhow::Result<()>>();

        let handle = thread::spawn(move || -> anyhow::Result<Vec<u8>> {
            let buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
            let (stream, sample_rate, channels) = match open_input(device_name, buffer.clone()) {
                Ok(opened) => opened,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return Ok(Vec::new());
                }
            };
            let _ = ready_tx.send(Ok(()));

            // Either a stop signal or the handle being dropped ends the recording.
            let _ = stop_rx.recv();
            drop(stream);

            let samples = match buffer.lock() {
                Ok(mut guard) => std::mem::take(&mut *guard),
                Err(_) => return Err(anyhow::anyhow!("capture buffer poisoned")),
            };
            tracing::debug!("captured {} samples at {}hz", samples.len(), sample_rate);
            Ok(wav_from_samples(&samples, sample_rate, channels)?)
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { stop_tx, handle }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(anyhow::anyhow!("capture thread exited before the stream started")),
        }
    }

    /// Stops recording and returns the clip as wav bytes.
    pub fn stop(self) -> anyhow::Result<Vec<u8>> {
        let _ = self.stop_tx.send(());
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("capture thread panicked"))?
    }
}

fn open_input(
    device_name: Option<String>,
    buffer: Arc<Mutex<Vec<f32>>>,
) -> anyhow::Result<(cpal::Stream, u32, u16)> {
    let device = get_or_default_input(device_name)?;
    let config = device.default_input_config()?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels();
    let stream_config: StreamConfig = config.into();
    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if let Ok(mut guard) = buffer.lock() {
                guard.extend_from_slice(data);
            }
        },
        move |err| tracing::error!("an error occurred on input stream: {}", err),
        None,
    )?;
    stream.play()?;
    Ok((stream, sample_rate, channels))
}
