//! 任务函数的工具描述生成（schemars 从参数结构体派生 JSON Schema）
//!
//! 子 schema 全部内联，嵌套类型展开为基础类型；去掉 `$schema` / `title` / `definitions` / `format`，
//! 使每个属性只剩 type + description。

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde_json::{json, Value};

use crate::actions::command::{
    TaskIdArgs, UpdateTaskArgs, ADD_TASK, COMPLETE_TASK, REMOVE_TASK, UPDATE_TASK,
};
use crate::assistant::{FunctionDefinition, FunctionTool};
use crate::store::NewTask;

fn parameters_for<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.option_nullable = false;
        s.option_add_null_type = false;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();
    let mut value = serde_json::to_value(root).unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("definitions");
        obj.remove("description");
    }
    strip_annotations(&mut value);
    value
}

/// 递归去掉 title / format / 数值范围；properties 下的键是字段名，只递归其值
fn strip_annotations(schema: &mut Value) {
    let Some(obj) = schema.as_object_mut() else {
        return;
    };
    for key in ["title", "format", "minimum", "maximum"] {
        obj.remove(key);
    }
    if let Some(Value::Object(props)) = obj.get_mut("properties") {
        for prop in props.values_mut() {
            strip_annotations(prop);
        }
    }
    if let Some(items) = obj.get_mut("items") {
        strip_annotations(items);
    }
}

fn function_tool(name: &str, description: &str, parameters: Value) -> FunctionTool {
    FunctionTool {
        kind: "function".to_string(),
        function: FunctionDefinition {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        },
    }
}

/// Assistant 可调用的四个任务函数
pub fn task_tools() -> Vec<FunctionTool> {
    vec![
        function_tool(ADD_TASK, "Adds a new task to the database.", parameters_for::<NewTask>()),
        function_tool(
            UPDATE_TASK,
            "Updates a task in the database.",
            parameters_for::<UpdateTaskArgs>(),
        ),
        function_tool(
            COMPLETE_TASK,
            "Marks a task as completed in the database.",
            parameters_for::<TaskIdArgs>(),
        ),
        function_tool(
            REMOVE_TASK,
            "Soft deletes a task in the database.",
            parameters_for::<TaskIdArgs>(),
        ),
    ]
}

/// `{"tools": [...]}`，格式化输出
pub fn tools_json() -> String {
    serde_json::to_string_pretty(&json!({ "tools": task_tools() }))
        .unwrap_or_else(|_| "{\"tools\": []}".to_string())
}
