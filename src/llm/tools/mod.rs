mod tool;
pub mod weather_tool;

pub use tool::{parse_tool_arguments, FunctionDescriptor, LlmTool, ToolDescriptor};
pub use weather_tool::GetWeatherTool;
