// Bindings for include/jepture_argus.h, laid out the way bindgen emits
// dynamically loaded bindings.

pub const JEP_PIXEL_FMT_YCBCR_420_888: u32 = 1;

pub const JEP_DENOISE_DEFAULT: i32 = -1;
pub const JEP_DENOISE_OFF: i32 = 0;
pub const JEP_DENOISE_FAST: i32 = 1;
pub const JEP_DENOISE_HIGH_QUALITY: i32 = 2;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct jep_provider {
    _unused: [u8; 0],
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct jep_session {
    _unused: [u8; 0],
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct jep_stream {
    _unused: [u8; 0],
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct jep_consumer {
    _unused: [u8; 0],
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct jep_frame {
    _unused: [u8; 0],
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct jep_range {
    pub min: f64,
    pub max: f64,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct jep_sensor_mode {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub min_frame_duration_ns: u64,
    pub max_frame_duration_ns: u64,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct jep_control_defaults {
    pub isp_digital_gain: jep_range,
    pub gain: jep_range,
    pub exposure_time: jep_range,
    pub optical_black: [f32; 4usize],
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct jep_request {
    pub sensor_mode: u32,
    pub frame_duration_ns: u64,
    pub isp_digital_gain: jep_range,
    pub gain: jep_range,
    pub exposure_time: jep_range,
    pub optical_black_enable: i32,
    pub optical_black: [f32; 4usize],
    pub denoise_mode: i32,
    pub denoise_strength_enable: i32,
    pub denoise_strength: f32,
}

pub struct ArgusLibrary {
    __library: ::libloading::Library,
    pub jep_provider_create: unsafe extern "C" fn() -> *mut jep_provider,
    pub jep_provider_destroy: unsafe extern "C" fn(provider: *mut jep_provider),
    pub jep_provider_version:
        unsafe extern "C" fn(provider: *mut jep_provider) -> *const ::std::os::raw::c_char,
    pub jep_provider_device_count: unsafe extern "C" fn(provider: *mut jep_provider) -> u32,
    pub jep_device_sensor_mode_count: unsafe extern "C" fn(
        provider: *mut jep_provider,
        device: u32,
    ) -> ::std::os::raw::c_int,
    pub jep_device_sensor_mode: unsafe extern "C" fn(
        provider: *mut jep_provider,
        device: u32,
        mode: u32,
        out: *mut jep_sensor_mode,
    ) -> ::std::os::raw::c_int,
    pub jep_session_create: unsafe extern "C" fn(
        provider: *mut jep_provider,
        devices: *const u32,
        count: usize,
    ) -> *mut jep_session,
    pub jep_session_destroy: unsafe extern "C" fn(session: *mut jep_session),
    pub jep_session_control_defaults: unsafe extern "C" fn(
        session: *mut jep_session,
        device: u32,
        mode: u32,
        out: *mut jep_control_defaults,
    ) -> ::std::os::raw::c_int,
    pub jep_session_repeat: unsafe extern "C" fn(
        session: *mut jep_session,
        request: *const jep_request,
        streams: *const *mut jep_stream,
        count: usize,
    ) -> ::std::os::raw::c_int,
    pub jep_session_stop_repeat:
        unsafe extern "C" fn(session: *mut jep_session) -> ::std::os::raw::c_int,
    pub jep_session_wait_for_idle:
        unsafe extern "C" fn(session: *mut jep_session) -> ::std::os::raw::c_int,
    pub jep_stream_create: unsafe extern "C" fn(
        session: *mut jep_session,
        device: u32,
        width: u32,
        height: u32,
        pixel_format: u32,
    ) -> *mut jep_stream,
    pub jep_stream_disconnect:
        unsafe extern "C" fn(stream: *mut jep_stream) -> ::std::os::raw::c_int,
    pub jep_stream_destroy: unsafe extern "C" fn(stream: *mut jep_stream),
    pub jep_consumer_create: unsafe extern "C" fn(stream: *mut jep_stream) -> *mut jep_consumer,
    pub jep_consumer_destroy: unsafe extern "C" fn(consumer: *mut jep_consumer),
    pub jep_consumer_acquire_frame: unsafe extern "C" fn(
        consumer: *mut jep_consumer,
        number: *mut u64,
        timestamp: *mut u64,
    ) -> *mut jep_frame,
    pub jep_frame_release: unsafe extern "C" fn(frame: *mut jep_frame),
    pub jep_frame_has_native_buffer:
        unsafe extern "C" fn(frame: *mut jep_frame) -> ::std::os::raw::c_int,
    pub jep_frame_create_nvbuffer: unsafe extern "C" fn(
        frame: *mut jep_frame,
        width: u32,
        height: u32,
    ) -> ::std::os::raw::c_int,
    pub jep_frame_copy_to_nvbuffer: unsafe extern "C" fn(
        frame: *mut jep_frame,
        fd: ::std::os::raw::c_int,
    ) -> ::std::os::raw::c_int,
    pub jep_nvbuffer_read_yuv420: unsafe extern "C" fn(
        fd: ::std::os::raw::c_int,
        y: *mut u8,
        u: *mut u8,
        v: *mut u8,
        width: u32,
        height: u32,
    ) -> ::std::os::raw::c_int,
    pub jep_nvbuffer_destroy:
        unsafe extern "C" fn(fd: ::std::os::raw::c_int) -> ::std::os::raw::c_int,
}

impl ArgusLibrary {
    pub unsafe fn new<P>(path: P) -> Result<Self, ::libloading::Error>
    where
        P: AsRef<::std::ffi::OsStr>,
    {
        let library = ::libloading::Library::new(path)?;
        Self::from_library(library)
    }

    pub unsafe fn from_library<L>(library: L) -> Result<Self, ::libloading::Error>
    where
        L: Into<::libloading::Library>,
    {
        let __library = library.into();
        let jep_provider_create = __library.get(b"jep_provider_create\0").map(|sym| *sym)?;
        let jep_provider_destroy = __library.get(b"jep_provider_destroy\0").map(|sym| *sym)?;
        let jep_provider_version = __library.get(b"jep_provider_version\0").map(|sym| *sym)?;
        let jep_provider_device_count = __library
            .get(b"jep_provider_device_count\0")
            .map(|sym| *sym)?;
        let jep_device_sensor_mode_count = __library
            .get(b"jep_device_sensor_mode_count\0")
            .map(|sym| *sym)?;
        let jep_device_sensor_mode = __library.get(b"jep_device_sensor_mode\0").map(|sym| *sym)?;
        let jep_session_create = __library.get(b"jep_session_create\0").map(|sym| *sym)?;
        let jep_session_destroy = __library.get(b"jep_session_destroy\0").map(|sym| *sym)?;
        let jep_session_control_defaults = __library
            .get(b"jep_session_control_defaults\0")
            .map(|sym| *sym)?;
        let jep_session_repeat = __library.get(b"jep_session_repeat\0").map(|sym| *sym)?;
        let jep_session_stop_repeat = __library
            .get(b"jep_session_stop_repeat\0")
            .map(|sym| *sym)?;
        let jep_session_wait_for_idle = __library
            .get(b"jep_session_wait_for_idle\0")
            .map(|sym| *sym)?;
        let jep_stream_create = __library.get(b"jep_stream_create\0").map(|sym| *sym)?;
        let jep_stream_disconnect = __library.get(b"jep_stream_disconnect\0").map(|sym| *sym)?;
        let jep_stream_destroy = __library.get(b"jep_stream_destroy\0").map(|sym| *sym)?;
        let jep_consumer_create = __library.get(b"jep_consumer_create\0").map(|sym| *sym)?;
        let jep_consumer_destroy = __library.get(b"jep_consumer_destroy\0").map(|sym| *sym)?;
        let jep_consumer_acquire_frame = __library
            .get(b"jep_consumer_acquire_frame\0")
            .map(|sym| *sym)?;
        let jep_frame_release = __library.get(b"jep_frame_release\0").map(|sym| *sym)?;
        let jep_frame_has_native_buffer = __library
            .get(b"jep_frame_has_native_buffer\0")
            .map(|sym| *sym)?;
        let jep_frame_create_nvbuffer = __library
            .get(b"jep_frame_create_nvbuffer\0")
            .map(|sym| *sym)?;
        let jep_frame_copy_to_nvbuffer = __library
            .get(b"jep_frame_copy_to_nvbuffer\0")
            .map(|sym| *sym)?;
        let jep_nvbuffer_read_yuv420 = __library
            .get(b"jep_nvbuffer_read_yuv420\0")
            .map(|sym| *sym)?;
        let jep_nvbuffer_destroy = __library.get(b"jep_nvbuffer_destroy\0").map(|sym| *sym)?;
        Ok(ArgusLibrary {
            __library,
            jep_provider_create,
            jep_provider_destroy,
            jep_provider_version,
            jep_provider_device_count,
            jep_device_sensor_mode_count,
            jep_device_sensor_mode,
            jep_session_create,
            jep_session_destroy,
            jep_session_control_defaults,
            jep_session_repeat,
            jep_session_stop_repeat,
            jep_session_wait_for_idle,
            jep_stream_create,
            jep_stream_disconnect,
            jep_stream_destroy,
            jep_consumer_create,
            jep_consumer_destroy,
            jep_consumer_acquire_frame,
            jep_frame_release,
            jep_frame_has_native_buffer,
            jep_frame_create_nvbuffer,
            jep_frame_copy_to_nvbuffer,
            jep_nvbuffer_read_yuv420,
            jep_nvbuffer_destroy,
        })
    }

    pub unsafe fn jep_provider_create(&self) -> *mut jep_provider {
        (self.jep_provider_create)()
    }

    pub unsafe fn jep_provider_destroy(&self, provider: *mut jep_provider) {
        (self.jep_provider_destroy)(provider)
    }

    pub unsafe fn jep_provider_version(
        &self,
        provider: *mut jep_provider,
    ) -> *const ::std::os::raw::c_char {
        (self.jep_provider_version)(provider)
    }

    pub unsafe fn jep_provider_device_count(&self, provider: *mut jep_provider) -> u32 {
        (self.jep_provider_device_count)(provider)
    }

    pub unsafe fn jep_device_sensor_mode_count(
        &self,
        provider: *mut jep_provider,
        device: u32,
    ) -> ::std::os::raw::c_int {
        (self.jep_device_sensor_mode_count)(provider, device)
    }

    pub unsafe fn jep_device_sensor_mode(
        &self,
        provider: *mut jep_provider,
        device: u32,
        mode: u32,
        out: *mut jep_sensor_mode,
    ) -> ::std::os::raw::c_int {
        (self.jep_device_sensor_mode)(provider, device, mode, out)
    }

    pub unsafe fn jep_session_create(
        &self,
        provider: *mut jep_provider,
        devices: *const u32,
        count: usize,
    ) -> *mut jep_session {
        (self.jep_session_create)(provider, devices, count)
    }

    pub unsafe fn jep_session_destroy(&self, session: *mut jep_session) {
        (self.jep_session_destroy)(session)
    }

    pub unsafe fn jep_session_control_defaults(
        &self,
        session: *mut jep_session,
        device: u32,
        mode: u32,
        out: *mut jep_control_defaults,
    ) -> ::std::os::raw::c_int {
        (self.jep_session_control_defaults)(session, device, mode, out)
    }

    pub unsafe fn jep_session_repeat(
        &self,
        session: *mut jep_session,
        request: *const jep_request,
        streams: *const *mut jep_stream,
        count: usize,
    ) -> ::std::os::raw::c_int {
        (self.jep_session_repeat)(session, request, streams, count)
    }

    pub unsafe fn jep_session_stop_repeat(&self, session: *mut jep_session) -> ::std::os::raw::c_int {
        (self.jep_session_stop_repeat)(session)
    }

    pub unsafe fn jep_session_wait_for_idle(
        &self,
        session: *mut jep_session,
    ) -> ::std::os::raw::c_int {
        (self.jep_session_wait_for_idle)(session)
    }

    pub unsafe fn jep_stream_create(
        &self,
        session: *mut jep_session,
        device: u32,
        width: u32,
        height: u32,
        pixel_format: u32,
    ) -> *mut jep_stream {
        (self.jep_stream_create)(session, device, width, height, pixel_format)
    }

    pub unsafe fn jep_stream_disconnect(&self, stream: *mut jep_stream) -> ::std::os::raw::c_int {
        (self.jep_stream_disconnect)(stream)
    }

    pub unsafe fn jep_stream_destroy(&self, stream: *mut jep_stream) {
        (self.jep_stream_destroy)(stream)
    }

    pub unsafe fn jep_consumer_create(&self, stream: *mut jep_stream) -> *mut jep_consumer {
        (self.jep_consumer_create)(stream)
    }

    pub unsafe fn jep_consumer_destroy(&self, consumer: *mut jep_consumer) {
        (self.jep_consumer_destroy)(consumer)
    }

    pub unsafe fn jep_consumer_acquire_frame(
        &self,
        consumer: *mut jep_consumer,
        number: *mut u64,
        timestamp: *mut u64,
    ) -> *mut jep_frame {
        (self.jep_consumer_acquire_frame)(consumer, number, timestamp)
    }

    pub unsafe fn jep_frame_release(&self, frame: *mut jep_frame) {
        (self.jep_frame_release)(frame)
    }

    pub unsafe fn jep_frame_has_native_buffer(&self, frame: *mut jep_frame) -> ::std::os::raw::c_int {
        (self.jep_frame_has_native_buffer)(frame)
    }

    pub unsafe fn jep_frame_create_nvbuffer(
        &self,
        frame: *mut jep_frame,
        width: u32,
        height: u32,
    ) -> ::std::os::raw::c_int {
        (self.jep_frame_create_nvbuffer)(frame, width, height)
    }

    pub unsafe fn jep_frame_copy_to_nvbuffer(
        &self,
        frame: *mut jep_frame,
        fd: ::std::os::raw::c_int,
    ) -> ::std::os::raw::c_int {
        (self.jep_frame_copy_to_nvbuffer)(frame, fd)
    }

    pub unsafe fn jep_nvbuffer_read_yuv420(
        &self,
        fd: ::std::os::raw::c_int,
        y: *mut u8,
        u: *mut u8,
        v: *mut u8,
        width: u32,
        height: u32,
    ) -> ::std::os::raw::c_int {
        (self.jep_nvbuffer_read_yuv420)(fd, y, u, v, width, height)
    }

    pub unsafe fn jep_nvbuffer_destroy(&self, fd: ::std::os::raw::c_int) -> ::std::os::raw::c_int {
        (self.jep_nvbuffer_destroy)(fd)
    }
}
