//! Document API installed into every fresh Lua state.
//!
//! ```lua
//! doc.set_title("Sliders")
//! local id = doc.add_root({ type = "Slider", title = "freq", start = 0 })
//! doc.clear()
//! print(app.name, app.mode, app.dir)
//! ```

use mlua::{Function, Lua, LuaSerdeExt, Table, Value, Variadic};
use serde_json::{Map, Value as Json};

use crate::core::AppContext;
use crate::document::Document;

/// Register `doc`, `app`, `print` and the module search path.
///
/// `os.exit` raises instead of terminating the server process.
pub(super) fn install(lua: &Lua, ctx: &AppContext) -> mlua::Result<()> {
    let globals = lua.globals();

    globals.set("doc", document_table(lua)?)?;
    globals.set("app", app_table(lua, ctx)?)?;
    globals.set("print", lua.create_function(print)?)?;

    let os: Table = globals.get("os")?;
    os.set(
        "exit",
        lua.create_function(|_, _: Variadic<Value>| {
            Err::<(), _>(mlua::Error::runtime("os.exit is not available to documents"))
        })?,
    )?;

    let package: Table = globals.get("package")?;
    let path: String = package.get("path")?;
    package.set(
        "path",
        format!("{}/?.lua;{}", ctx.directory.display(), path),
    )?;

    Ok(())
}

fn document_table(lua: &Lua) -> mlua::Result<Table> {
    let doc = lua.create_table()?;

    doc.set(
        "set_title",
        lua.create_function(|lua, title: String| {
            with_document(lua, |d| d.title = Some(title))
        })?,
    )?;

    doc.set(
        "add_root",
        lua.create_function(|lua, value: Value| {
            let json: Json = lua.from_value(value)?;
            let (kind, props) = split_model(json).map_err(mlua::Error::runtime)?;
            with_document(lua, |d| d.add_root(kind, props))
        })?,
    )?;

    doc.set(
        "clear",
        lua.create_function(|lua, ()| with_document(lua, Document::clear))?,
    )?;

    Ok(doc)
}

fn app_table(lua: &Lua, ctx: &AppContext) -> mlua::Result<Table> {
    let app = lua.create_table()?;
    app.set("name", ctx.name.as_str())?;
    app.set("mode", ctx.mode.as_str())?;
    app.set("dir", ctx.directory.display().to_string())?;
    Ok(app)
}

/// `print` replacement: one `[app]` log line per call.
fn print(lua: &Lua, args: Variadic<Value>) -> mlua::Result<()> {
    let tostring: Function = lua.globals().get("tostring")?;
    let parts = args
        .iter()
        .map(|v| tostring.call::<String>(v.clone()))
        .collect::<mlua::Result<Vec<_>>>()?;
    crate::log!("app"; "{}", parts.join("\t"));
    crate::logger::status_detach();
    Ok(())
}

fn with_document<R>(lua: &Lua, f: impl FnOnce(&mut Document) -> R) -> mlua::Result<R> {
    let mut doc = lua
        .app_data_mut::<Document>()
        .ok_or_else(|| mlua::Error::runtime("document is not available"))?;
    Ok(f(&mut *doc))
}

/// Split a root table into its `type` and the remaining props.
fn split_model(json: Json) -> Result<(String, Map<String, Json>), String> {
    let Json::Object(mut props) = json else {
        return Err("add_root expects a table with a 'type' field".to_string());
    };
    match props.remove("type") {
        Some(Json::String(kind)) if !kind.is_empty() => Ok((kind, props)),
        Some(_) => Err("add_root: 'type' must be a non-empty string".to_string()),
        None => Err("add_root: missing 'type' field".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_model() {
        let (kind, props) = split_model(json!({"type": "Slider", "start": 0})).unwrap();
        assert_eq!(kind, "Slider");
        assert_eq!(props.len(), 1);
        assert_eq!(props["start"], 0);
    }

    #[test]
    fn test_split_model_rejects_missing_type() {
        let err = split_model(json!({"title": "x"})).unwrap_err();
        assert!(err.contains("type"));
    }

    #[test]
    fn test_split_model_rejects_non_table() {
        assert!(split_model(json!("Slider")).is_err());
        assert!(split_model(json!({"type": 3})).is_err());
        assert!(split_model(json!({"type": ""})).is_err());
    }
}
