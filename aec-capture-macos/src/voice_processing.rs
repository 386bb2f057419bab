//! Voice-Processing I/O engine.
//!
//! Wraps Apple's `kAudioUnitSubType_VoiceProcessingIO` unit, which runs
//! acoustic echo cancellation between the microphone (bus 1) and the
//! speaker path (bus 0). Output has to be enabled for the canceller to get
//! its reference signal; this engine plays silence on it.

use std::os::raw::c_void;
use std::ptr;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;

use coreaudio::audio_unit::macos_helpers::{get_default_device_id, get_device_name};
use coreaudio::sys::{self, AudioBuffer, AudioBufferList, AudioUnitRenderActionFlags};

use aec_capture_core::models::audio_models::{AudioFrameBatch, AudioSource};
use aec_capture_core::models::error::CaptureError;
use aec_capture_core::models::state::EngineState;
use aec_capture_core::traits::audio_engine::{EchoCancellingEngine, EngineFault, FrameCallback};

use crate::os_status;

const INPUT_BUS: u32 = 1;
const OUTPUT_BUS: u32 = 0;

/// Scratch size used when the unit does not report its slice limit.
const FALLBACK_MAX_FRAMES: usize = 4096;

/// Owned by the input callback through `inRefCon`.
struct InputContext {
    audio_unit: sys::AudioUnit,
    scratch: Vec<f32>,
    callback: FrameCallback,
    render_failures: Arc<AtomicU64>,
    last_status: Arc<AtomicI32>,
}

impl InputContext {
    fn record_failure(&self, status: sys::OSStatus) {
        self.last_status.store(status, Ordering::Relaxed);
        self.render_failures.fetch_add(1, Ordering::Relaxed);
    }
}

/// Pulls echo-cancelled frames from bus 1 and hands them to the consumer.
unsafe extern "C" fn input_callback_proc(
    in_ref_con: *mut c_void,
    io_action_flags: *mut AudioUnitRenderActionFlags,
    in_time_stamp: *const sys::AudioTimeStamp,
    in_bus_number: u32,
    in_number_frames: u32,
    _io_data: *mut AudioBufferList,
) -> sys::OSStatus {
    // SAFETY: in_ref_con is the InputContext installed in `start`; it is freed
    // only after AudioOutputUnitStop has returned, and Core Audio invokes this
    // callback from a single thread.
    let context = &mut *(in_ref_con as *mut InputContext);
    let frames = in_number_frames as usize;

    if frames > context.scratch.len() {
        context.record_failure(os_status::PARAM_ERROR);
        return os_status::PARAM_ERROR;
    }

    let mut buffer_list = AudioBufferList {
        mNumberBuffers: 1,
        mBuffers: [AudioBuffer {
            mNumberChannels: 1,
            mDataByteSize: (frames * std::mem::size_of::<f32>()) as u32,
            mData: context.scratch.as_mut_ptr() as *mut c_void,
        }],
    };

    let status = sys::AudioUnitRender(
        context.audio_unit,
        io_action_flags,
        in_time_stamp,
        in_bus_number,
        in_number_frames,
        &mut buffer_list,
    );
    if status != 0 {
        context.record_failure(status);
        return status;
    }

    (context.callback)(AudioFrameBatch::mono(&context.scratch[..frames]));
    0
}

/// Supplies silence to the speaker path and marks the buffers as silent.
unsafe extern "C" fn render_callback_proc(
    _in_ref_con: *mut c_void,
    io_action_flags: *mut AudioUnitRenderActionFlags,
    _in_time_stamp: *const sys::AudioTimeStamp,
    _in_bus_number: u32,
    _in_number_frames: u32,
    io_data: *mut AudioBufferList,
) -> sys::OSStatus {
    if !io_data.is_null() {
        let list = &mut *io_data;
        let buffers = std::slice::from_raw_parts_mut(list.mBuffers.as_mut_ptr(), list.mNumberBuffers as usize);
        for buffer in buffers {
            if !buffer.mData.is_null() {
                ptr::write_bytes(buffer.mData as *mut u8, 0, buffer.mDataByteSize as usize);
            }
        }
    }
    if !io_action_flags.is_null() {
        *io_action_flags |= sys::kAudioUnitRenderAction_OutputIsSilence;
    }
    0
}

/// A configured unit and the context its input callback points at.
///
/// Dropping it tears everything down in reverse order: stop, uninitialize,
/// dispose, then free the context.
struct ActiveUnit {
    unit: sys::AudioUnit,
    context: *mut InputContext,
    initialized: bool,
    started: bool,
}

// SAFETY: the unit handle and context pointer are only touched from the
// thread that owns the engine; the real-time thread reaches the context
// through Core Audio, which stops calling it before Drop frees it.
unsafe impl Send for ActiveUnit {}

impl ActiveUnit {
    fn instantiate() -> Result<Self, CaptureError> {
        let desc = sys::AudioComponentDescription {
            componentType: sys::kAudioUnitType_Output,
            componentSubType: sys::kAudioUnitSubType_VoiceProcessingIO,
            componentManufacturer: sys::kAudioUnitManufacturer_Apple,
            componentFlags: 0,
            componentFlagsMask: 0,
        };

        let component = unsafe { sys::AudioComponentFindNext(ptr::null_mut(), &desc) };
        if component.is_null() {
            log::error!("voice-processing I/O component not found");
            return Err(CaptureError::DeviceNotAvailable);
        }

        let mut unit: sys::AudioUnit = ptr::null_mut();
        let status = unsafe { sys::AudioComponentInstanceNew(component, &mut unit) };
        if status != 0 || unit.is_null() {
            return Err(os_status::classify("create audio unit", status));
        }

        Ok(Self {
            unit,
            context: ptr::null_mut(),
            initialized: false,
            started: false,
        })
    }

    fn set_property<T>(&self, step: &str, id: u32, scope: u32, element: u32, value: &T) -> Result<(), CaptureError> {
        let status = unsafe {
            sys::AudioUnitSetProperty(
                self.unit,
                id,
                scope,
                element,
                value as *const T as *const c_void,
                std::mem::size_of::<T>() as u32,
            )
        };
        check(step, status)
    }

    fn max_frames_per_slice(&self) -> usize {
        let mut frames: u32 = 0;
        let mut size = std::mem::size_of::<u32>() as u32;
        let status = unsafe {
            sys::AudioUnitGetProperty(
                self.unit,
                sys::kAudioUnitProperty_MaximumFramesPerSlice,
                sys::kAudioUnitScope_Global,
                0,
                &mut frames as *mut u32 as *mut c_void,
                &mut size,
            )
        };
        if status != 0 || frames == 0 {
            log::debug!(
                "maximum frames per slice unavailable ({}), using {}",
                os_status::describe(status),
                FALLBACK_MAX_FRAMES
            );
            FALLBACK_MAX_FRAMES
        } else {
            frames as usize
        }
    }

    fn configure(&mut self, sample_rate: f64) -> Result<usize, CaptureError> {
        let enable: u32 = 1;
        self.set_property(
            "enable input",
            sys::kAudioOutputUnitProperty_EnableIO,
            sys::kAudioUnitScope_Input,
            INPUT_BUS,
            &enable,
        )?;
        self.set_property(
            "enable output",
            sys::kAudioOutputUnitProperty_EnableIO,
            sys::kAudioUnitScope_Output,
            OUTPUT_BUS,
            &enable,
        )?;

        let format = mono_float_format(sample_rate);
        self.set_property(
            "set input stream format",
            sys::kAudioUnitProperty_StreamFormat,
            sys::kAudioUnitScope_Output,
            INPUT_BUS,
            &format,
        )?;
        self.set_property(
            "set output stream format",
            sys::kAudioUnitProperty_StreamFormat,
            sys::kAudioUnitScope_Input,
            OUTPUT_BUS,
            &format,
        )?;
        log::debug!("stream format: mono {} Hz float32", sample_rate);

        Ok(self.max_frames_per_slice())
    }

    /// Install both callbacks. Takes ownership of `context`.
    fn install_callbacks(&mut self, context: Box<InputContext>) -> Result<(), CaptureError> {
        let context = Box::into_raw(context);
        self.context = context;

        let input = sys::AURenderCallbackStruct {
            inputProc: Some(input_callback_proc),
            inputProcRefCon: context as *mut c_void,
        };
        self.set_property(
            "set input callback",
            sys::kAudioOutputUnitProperty_SetInputCallback,
            sys::kAudioUnitScope_Global,
            INPUT_BUS,
            &input,
        )?;

        let render = sys::AURenderCallbackStruct {
            inputProc: Some(render_callback_proc),
            inputProcRefCon: ptr::null_mut(),
        };
        self.set_property(
            "set render callback",
            sys::kAudioUnitProperty_SetRenderCallback,
            sys::kAudioUnitScope_Input,
            OUTPUT_BUS,
            &render,
        )
    }

    fn initialize(&mut self) -> Result<(), CaptureError> {
        check("initialize audio unit", unsafe { sys::AudioUnitInitialize(self.unit) })?;
        self.initialized = true;
        Ok(())
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        check("start audio unit", unsafe { sys::AudioOutputUnitStart(self.unit) })?;
        self.started = true;
        Ok(())
    }
}

impl Drop for ActiveUnit {
    fn drop(&mut self) {
        unsafe {
            if self.started {
                sys::AudioOutputUnitStop(self.unit);
            }
            if self.initialized {
                sys::AudioUnitUninitialize(self.unit);
            }
            sys::AudioComponentInstanceDispose(self.unit);
            if !self.context.is_null() {
                drop(Box::from_raw(self.context));
            }
        }
    }
}

fn check(step: &str, status: sys::OSStatus) -> Result<(), CaptureError> {
    if status == 0 {
        Ok(())
    } else {
        log::error!("{} failed: {}", step, os_status::describe(status));
        Err(os_status::classify(step, status))
    }
}

fn mono_float_format(sample_rate: f64) -> sys::AudioStreamBasicDescription {
    let bytes = std::mem::size_of::<f32>() as u32;
    sys::AudioStreamBasicDescription {
        mSampleRate: sample_rate,
        mFormatID: sys::kAudioFormatLinearPCM,
        mFormatFlags: sys::kAudioFormatFlagIsFloat | sys::kAudioFormatFlagIsPacked,
        mBytesPerPacket: bytes,
        mFramesPerPacket: 1,
        mBytesPerFrame: bytes,
        mChannelsPerFrame: 1,
        mBitsPerChannel: bytes * 8,
        mReserved: 0,
    }
}

/// Echo-cancelling microphone capture through the Voice-Processing I/O unit.
pub struct VoiceProcessingEngine {
    sample_rate: f64,
    state: EngineState,
    unit: Option<ActiveUnit>,
    render_failures: Arc<AtomicU64>,
    last_status: Arc<AtomicI32>,
}

impl VoiceProcessingEngine {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            state: EngineState::Uninitialized,
            unit: None,
            render_failures: Arc::new(AtomicU64::new(0)),
            last_status: Arc::new(AtomicI32::new(0)),
        }
    }

    fn build(&self, callback: FrameCallback) -> Result<ActiveUnit, CaptureError> {
        let mut unit = ActiveUnit::instantiate()?;
        let max_frames = unit.configure(self.sample_rate)?;

        let context = Box::new(InputContext {
            audio_unit: unit.unit,
            scratch: vec![0.0; max_frames],
            callback,
            render_failures: Arc::clone(&self.render_failures),
            last_status: Arc::clone(&self.last_status),
        });
        unit.install_callbacks(context)?;
        unit.initialize()?;
        unit.start()?;

        log::info!(
            "voice-processing I/O started: {} Hz mono, up to {} frames per slice",
            self.sample_rate,
            max_frames
        );
        Ok(unit)
    }
}

impl Default for VoiceProcessingEngine {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl EchoCancellingEngine for VoiceProcessingEngine {
    fn is_available(&self) -> bool {
        get_default_device_id(true).is_some()
    }

    fn start(&mut self, callback: FrameCallback) -> Result<(), CaptureError> {
        if !self.state.can_start() {
            return Err(CaptureError::AlreadyRunning);
        }
        if !self.is_available() {
            log::error!("no default input device");
            return Err(CaptureError::DeviceNotAvailable);
        }

        self.render_failures.store(0, Ordering::Relaxed);
        self.last_status.store(0, Ordering::Relaxed);

        let unit = self.build(callback)?;
        self.unit = Some(unit);
        self.state = EngineState::Running;
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(unit) = self.unit.take() {
            drop(unit);
            log::info!("voice-processing I/O stopped");
        }
        if self.state.is_running() {
            self.state = EngineState::Stopped;
        }
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn device_info(&self) -> AudioSource {
        match get_default_device_id(true) {
            Some(id) => AudioSource {
                id: id.to_string(),
                name: get_device_name(id).unwrap_or_else(|_| "Default Microphone".into()),
                is_default: true,
            },
            None => AudioSource {
                id: "none".into(),
                name: "No Input Device".into(),
                is_default: false,
            },
        }
    }

    fn fault(&self) -> Option<EngineFault> {
        let count = self.render_failures.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        Some(EngineFault {
            status: self.last_status.load(Ordering::Relaxed),
            count,
        })
    }
}

impl Drop for VoiceProcessingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
