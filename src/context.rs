//! Explicit application context
//!
//! Everything that used to be ambient (console handle, log file,
//! capability table, config) is constructed once at startup and threaded
//! through function calls. No component reads globals.

use crate::config::Config;
use crate::logsink::LogSink;
use crate::output::OutputMode;
use crate::platform::{Capabilities, OsKind};
use crate::render::{ConsoleSurface, NullSurface, RenderSurface};

pub struct AppContext {
    pub os: OsKind,
    pub caps: Capabilities,
    pub config: Config,
    pub mode: OutputMode,
    pub sink: LogSink,
    pub render: Box<dyn RenderSurface>,
}

impl AppContext {
    pub fn init(mode: OutputMode) -> Self {
        let os = OsKind::current();
        let render: Box<dyn RenderSurface> = if mode == OutputMode::Quiet {
            Box::new(NullSurface)
        } else {
            Box::new(ConsoleSurface::new())
        };
        Self {
            os,
            caps: Capabilities::for_os(os),
            config: Config::load(),
            mode,
            sink: LogSink::open_default(),
            render,
        }
    }

    /// Context wired to the given surface and a throwaway sink, for tests
    #[cfg(test)]
    pub fn for_tests(render: Box<dyn RenderSurface>) -> Self {
        let os = OsKind::current();
        Self {
            os,
            caps: Capabilities::for_os(os),
            config: Config::default(),
            mode: OutputMode::Quiet,
            sink: LogSink::at(std::env::temp_dir().join("upkeep-test.log")),
            render,
        }
    }
}
