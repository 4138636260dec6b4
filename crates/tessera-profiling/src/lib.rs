pub use puffin;

/// Turns scope collection on or off for the whole process.
pub fn set_enabled(enabled: bool) {
    puffin::set_scopes_on(enabled);
}

/// Closes the current profiler frame. Import and cache calls are one frame each.
pub fn new_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[macro_export]
macro_rules! profile_function {
    () => {
        $crate::puffin::profile_function!();
    };
}
