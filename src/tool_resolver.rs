//! # Tool Path Resolver
//!
//! This module handles finding ffmpeg and ffprobe in different environments:
//! - Explicit directory from the configuration (`ffmpeg_dir`)
//! - `TOOLS_DIR` environment variable override
//! - Tools shipped next to the executable
//! - System-installed tools on the PATH

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Tools the application shells out to
pub const REQUIRED_TOOLS: [&str; 2] = ["ffmpeg", "ffprobe"];

/// Tool path resolver for different deployment environments
#[derive(Debug, Clone)]
pub struct ToolPathResolver {
    /// Directory searched before the PATH
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    /// Create a new path resolver, preferring `explicit_dir` when given
    pub fn new(explicit_dir: Option<PathBuf>) -> Self {
        let tools_dir = explicit_dir.or_else(Self::detect_tools_dir);
        debug!("Tools directory: {:?}", tools_dir);
        Self { tools_dir }
    }

    fn detect_tools_dir() -> Option<PathBuf> {
        if let Ok(tools_dir) = env::var("TOOLS_DIR") {
            let tools_path = PathBuf::from(tools_dir);
            debug!("Checking TOOLS_DIR environment variable: {:?}", tools_path);
            if tools_path.is_dir() {
                return Some(tools_path);
            }
        }

        let exe_path = env::current_exe().ok()?;
        let app_dir = exe_path.parent()?;
        let possible_paths = [app_dir.join("tools"), app_dir.to_path_buf()];

        possible_paths
            .into_iter()
            .find(|path| REQUIRED_TOOLS.iter().all(|tool| path.join(executable_name(tool)).exists()))
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        if let Some(ref tools_dir) = self.tools_dir {
            let bundled_path = tools_dir.join(executable_name(tool_name));
            if bundled_path.exists() {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled_path);
                return Some(bundled_path);
            }
            debug!("Bundled path does not exist: {:?}", bundled_path);
        }

        self.find_in_system_path(tool_name)
    }

    /// Find tool in system PATH
    fn find_in_system_path(&self, tool_name: &str) -> Option<PathBuf> {
        let tool_with_ext = executable_name(tool_name);
        let path_var = env::var_os("PATH")?;

        env::split_paths(&path_var)
            .map(|dir| dir.join(&tool_with_ext))
            .find(|path| path.is_file())
    }

    /// Check if a specific tool is available
    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        self.resolve_tool(tool_name).is_some()
    }

    /// Check if a tool is available and provide installation instructions if not
    pub fn check_tool_with_instructions(&self, tool_name: &str) -> Result<PathBuf, String> {
        self.resolve_tool(tool_name).ok_or_else(|| {
            format!(
                "Tool '{}' not found in {}PATH.\nTo install, run:\n  {}",
                tool_name,
                self.tools_dir
                    .as_deref()
                    .map(|dir| format!("{} or ", dir.display()))
                    .unwrap_or_default(),
                install_instructions(tool_name)
            )
        })
    }

    /// Get a report of tool availability
    pub fn get_tools_report(&self) -> String {
        let mut report = String::from("Tool Path Resolver Report\n");
        report.push_str(&format!("Tools dir: {:?}\n\nTool Availability:\n", self.tools_dir));

        for tool in REQUIRED_TOOLS {
            match self.resolve_tool(tool) {
                Some(path) => report.push_str(&format!("  ✅ {} -> {:?}\n", tool, path)),
                None => report.push_str(&format!(
                    "  ❌ {} (install with: {})\n",
                    tool,
                    install_instructions(tool)
                )),
            }
        }

        report
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Platform-specific executable file name
pub fn executable_name(tool_name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", tool_name)
    } else {
        tool_name.to_string()
    }
}

fn install_instructions(tool_name: &str) -> &'static str {
    match tool_name {
        "ffmpeg" | "ffprobe" => {
            if cfg!(target_os = "macos") {
                "brew install ffmpeg"
            } else if cfg!(windows) {
                "winget install ffmpeg"
            } else {
                "sudo apt-get install ffmpeg"
            }
        }
        _ => "see the tool's documentation",
    }
}
