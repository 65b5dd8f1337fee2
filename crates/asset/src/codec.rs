//! Positional codec for scene file lines.
//!
//! A line is `KEYWORD;field;field;...`. Every record kind has a fixed schema:
//! an ordered list of [`Field`]s, each knowing how to read itself from a token
//! and write itself back. Tokens are assigned to schema fields strictly in
//! arrival order. Numeric parsing never fails: anything unparseable is zero.

use std::fmt::{Display, Write};

use corelib::{MaterialRecord, PrimitiveKind, PrimitiveRecord, SceneInfo, TextureRecord};

/// The four record kinds a scene file contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    SceneInfo,
    Primitive,
    Material,
    Texture,
}

impl RecordKind {
    pub const ALL: [RecordKind; 4] = [
        RecordKind::SceneInfo,
        RecordKind::Material,
        RecordKind::Primitive,
        RecordKind::Texture,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            RecordKind::SceneInfo => "SCENEINFO",
            RecordKind::Primitive => "PRIMITIVE",
            RecordKind::Material => "MATERIAL",
            RecordKind::Texture => "TEXTURE",
        }
    }

    /// Select the record kind from the leading keyword of `line`.
    pub fn detect(line: &str) -> Option<RecordKind> {
        Self::ALL
            .into_iter()
            .find(|kind| line.starts_with(kind.keyword()))
    }

    /// Field names of this kind's schema, in file order.
    pub fn field_names(self) -> Vec<&'static str> {
        fn names<R>(schema: &[Field<R>]) -> Vec<&'static str> {
            schema.iter().map(|f| f.name).collect()
        }
        match self {
            RecordKind::SceneInfo => names(SCENE_INFO_FIELDS),
            RecordKind::Primitive => names(PRIMITIVE_FIELDS),
            RecordKind::Material => names(MATERIAL_FIELDS),
            RecordKind::Texture => names(TEXTURE_FIELDS),
        }
    }
}

/// A decoded line of any kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    SceneInfo(SceneInfo),
    Primitive(PrimitiveRecord),
    Material(MaterialRecord),
    Texture(TextureRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::SceneInfo(_) => RecordKind::SceneInfo,
            Record::Primitive(_) => RecordKind::Primitive,
            Record::Material(_) => RecordKind::Material,
            Record::Texture(_) => RecordKind::Texture,
        }
    }
}

/// One schema entry: a named field with its token reader and writer.
pub struct Field<R> {
    pub name: &'static str,
    pub read: fn(&mut R, &str),
    pub write: fn(&R, &mut String),
}

/// Parse an integer the way C's `atoi` does: leading whitespace is skipped,
/// the longest integer prefix is used, and anything else yields `0`.
pub fn parse_int(token: &str) -> i32 {
    let token = token.trim();
    if let Ok(value) = token.parse::<i32>() {
        return value;
    }
    let end = numeric_prefix_len(token, false);
    token[..end].parse().unwrap_or(0)
}

/// Parse a float the way C's `atof` does, with `0.0` as the fallback.
pub fn parse_float(token: &str) -> f32 {
    let token = token.trim();
    if let Ok(value) = token.parse::<f32>() {
        return value;
    }
    let end = numeric_prefix_len(token, true);
    token[..end].parse().unwrap_or(0.0)
}

/// Length of the leading `[+-]digits[.digits][e[+-]digits]` run in `s`.
fn numeric_prefix_len(s: &str, fractional: bool) -> usize {
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut i = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(i);
    let mut has_digits = int_end > i;
    i = int_end;
    if !fractional {
        return if has_digits { i } else { 0 };
    }

    if bytes.get(i) == Some(&b'.') {
        let frac_end = digits_from(i + 1);
        has_digits |= frac_end > i + 1;
        i = frac_end;
    }
    if !has_digits {
        return 0;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_end = digits_from(j);
        if exp_end > j {
            i = exp_end;
        }
    }
    i
}

fn push_value(out: &mut String, value: impl Display) {
    // Writing into a String cannot fail.
    let _ = write!(out, "{value}");
}

macro_rules! schema {
    (@field $ty:ty, int, $name:literal, $($path:ident).+) => {
        Field {
            name: $name,
            read: |r: &mut $ty, token: &str| r.$($path).+ = parse_int(token),
            write: |r: &$ty, out: &mut String| push_value(out, r.$($path).+),
        }
    };
    (@field $ty:ty, float, $name:literal, $($path:ident).+) => {
        Field {
            name: $name,
            read: |r: &mut $ty, token: &str| r.$($path).+ = parse_float(token),
            write: |r: &$ty, out: &mut String| push_value(out, r.$($path).+),
        }
    };
    (@field $ty:ty, kind, $name:literal, $($path:ident).+) => {
        Field {
            name: $name,
            read: |r: &mut $ty, token: &str| r.$($path).+ = PrimitiveKind::from(parse_int(token)),
            write: |r: &$ty, out: &mut String| push_value(out, r.$($path).+.code()),
        }
    };
    (@field $ty:ty, text, $name:literal, $($path:ident).+) => {
        Field {
            name: $name,
            read: |r: &mut $ty, token: &str| r.$($path).+ = token.to_string(),
            write: |r: &$ty, out: &mut String| out.push_str(&r.$($path).+),
        }
    };
    ($ty:ty { $($kind:ident $name:literal => $($path:ident).+),* $(,)? }) => {
        &[$(schema!(@field $ty, $kind, $name, $($path).+)),*]
    };
}

pub const SCENE_INFO_FIELDS: &[Field<SceneInfo>] = schema!(SceneInfo {
    int "width" => width,
    int "height" => height,
    int "graphicsLevel" => graphics_level,
    int "rayIterations" => ray_iterations,
    float "transparentColor" => transparent_color,
    float "viewDistance" => view_distance,
    float "shadowIntensity" => shadow_intensity,
    float "width3DVision" => width_3d_vision,
    float "bgR" => background_color.x,
    float "bgG" => background_color.y,
    float "bgB" => background_color.z,
    float "bgA" => background_color.w,
    int "renderingType" => rendering_type,
    int "renderBoxes" => render_boxes,
    int "ptIteration" => path_tracing_iteration,
    int "ptMaxIterations" => max_path_tracing_iterations,
    int "misc0" => misc.x,
    int "misc1" => misc.y,
});

pub const PRIMITIVE_FIELDS: &[Field<PrimitiveRecord>] = schema!(PrimitiveRecord {
    kind "type" => kind,
    float "p0x" => p0.x, float "p0y" => p0.y, float "p0z" => p0.z,
    float "p1x" => p1.x, float "p1y" => p1.y, float "p1z" => p1.z,
    float "p2x" => p2.x, float "p2y" => p2.y, float "p2z" => p2.z,
    float "n0x" => n0.x, float "n0y" => n0.y, float "n0z" => n0.z,
    float "n1x" => n1.x, float "n1y" => n1.y, float "n1z" => n1.z,
    float "n2x" => n2.x, float "n2y" => n2.y, float "n2z" => n2.z,
    float "sx" => size.x, float "sy" => size.y, float "sz" => size.z,
    int "materialId" => material_id,
    float "vt0x" => vt0.x, float "vt0y" => vt0.y, float "vt0z" => vt0.z,
    float "vt1x" => vt1.x, float "vt1y" => vt1.y, float "vt1z" => vt1.z,
    float "vt2x" => vt2.x, float "vt2y" => vt2.y, float "vt2z" => vt2.z,
});

pub const MATERIAL_FIELDS: &[Field<MaterialRecord>] = schema!(MaterialRecord {
    float "r" => color.x,
    float "g" => color.y,
    float "b" => color.z,
    float "a" => color.w,
    float "illumR" => inner_illumination.x,
    float "illumG" => inner_illumination.y,
    float "illumB" => inner_illumination.z,
    float "illumA" => inner_illumination.w,
    float "reflection" => reflection,
    float "refraction" => refraction,
    float "specR" => specular.x,
    float "specG" => specular.y,
    float "specB" => specular.z,
    float "specA" => specular.w,
    int "attr0" => attributes.x,
    int "attr1" => attributes.y,
    int "attr2" => attributes.z,
    int "attr3" => attributes.w,
    float "transparency" => transparency,
    int "texMap0" => texture_mapping.x,
    int "texMap1" => texture_mapping.y,
    int "texMapSlot" => texture_mapping.z,
    int "texMap3" => texture_mapping.w,
});

pub const TEXTURE_FIELDS: &[Field<TextureRecord>] = schema!(TextureRecord {
    int "slotIndex" => slot,
    text "filePath" => path,
});

/// Decode the part of `line` after `keyword` and its separator into a fresh `R`.
///
/// Each `;`-terminated token fills the next schema field. A trailing token
/// with no terminator goes to the schema's last field when non-empty. Tokens
/// beyond the schema are ignored; missing tokens leave fields at default.
pub fn decode_fields<R: Default>(line: &str, keyword: &str, schema: &[Field<R>]) -> R {
    let mut record = R::default();
    let line = line.trim_end_matches(['\r', '\n']);
    let body = line.get(keyword.len() + 1..).unwrap_or("");

    let (terminated, trailing) = match body.rfind(';') {
        Some(pos) => (Some(&body[..pos]), &body[pos + 1..]),
        None => (None, body),
    };

    let tokens = terminated.into_iter().flat_map(|t| t.split(';'));
    for (field, token) in schema.iter().zip(tokens) {
        (field.read)(&mut record, token);
    }
    if !trailing.is_empty() {
        if let Some(last) = schema.last() {
            (last.read)(&mut record, trailing);
        }
    }
    record
}

/// Encode `record` as `keyword;f0;f1;...;fn\n` following `schema`.
pub fn encode_fields<R>(record: &R, keyword: &str, schema: &[Field<R>]) -> String {
    let mut line = String::with_capacity(keyword.len() + schema.len() * 8);
    line.push_str(keyword);
    for field in schema {
        line.push(';');
        (field.write)(record, &mut line);
    }
    line.push('\n');
    line
}

/// Decode `line` as a record of the given kind.
pub fn decode_line(line: &str, kind: RecordKind) -> Record {
    let keyword = kind.keyword();
    match kind {
        RecordKind::SceneInfo => Record::SceneInfo(decode_fields(line, keyword, SCENE_INFO_FIELDS)),
        RecordKind::Primitive => Record::Primitive(decode_fields(line, keyword, PRIMITIVE_FIELDS)),
        RecordKind::Material => Record::Material(decode_fields(line, keyword, MATERIAL_FIELDS)),
        RecordKind::Texture => Record::Texture(decode_fields(line, keyword, TEXTURE_FIELDS)),
    }
}

/// Encode a record as one newline-terminated line.
pub fn encode_line(record: &Record) -> String {
    let keyword = record.kind().keyword();
    match record {
        Record::SceneInfo(r) => encode_fields(r, keyword, SCENE_INFO_FIELDS),
        Record::Primitive(r) => encode_fields(r, keyword, PRIMITIVE_FIELDS),
        Record::Material(r) => encode_fields(r, keyword, MATERIAL_FIELDS),
        Record::Texture(r) => encode_fields(r, keyword, TEXTURE_FIELDS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::{MATERIAL_NONE, vec3, vec4};

    #[test]
    fn schemas_match_file_layout() {
        assert_eq!(SCENE_INFO_FIELDS.len(), 18);
        assert_eq!(PRIMITIVE_FIELDS.len(), 32);
        assert_eq!(MATERIAL_FIELDS.len(), 23);
        assert_eq!(TEXTURE_FIELDS.len(), 2);

        let prim = RecordKind::Primitive.field_names();
        assert_eq!(prim[0], "type");
        assert_eq!(prim[19], "sx");
        assert_eq!(prim[22], "materialId");
        assert_eq!(prim[31], "vt2z");
        assert_eq!(RecordKind::Material.field_names()[21], "texMapSlot");
    }

    #[test]
    fn permissive_integer_parsing() {
        assert_eq!(parse_int("42"), 42);
        assert_eq!(parse_int(" -7 "), -7);
        assert_eq!(parse_int("12abc"), 12);
        assert_eq!(parse_int("3.9"), 3);
        assert_eq!(parse_int("abc"), 0);
        assert_eq!(parse_int(""), 0);
        assert_eq!(parse_int("-"), 0);
    }

    #[test]
    fn permissive_float_parsing() {
        assert_eq!(parse_float("1.5"), 1.5);
        assert_eq!(parse_float("-2.5e2"), -250.0);
        assert_eq!(parse_float("0.25xyz"), 0.25);
        assert_eq!(parse_float("7e"), 7.0);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("nope"), 0.0);
        assert_eq!(parse_float("."), 0.0);
    }

    #[test]
    fn detect_by_leading_keyword() {
        assert_eq!(RecordKind::detect("SCENEINFO;1;2"), Some(RecordKind::SceneInfo));
        assert_eq!(RecordKind::detect("PRIMITIVE;0"), Some(RecordKind::Primitive));
        assert_eq!(RecordKind::detect("MATERIAL;0"), Some(RecordKind::Material));
        assert_eq!(RecordKind::detect("TEXTURE;0;a.bmp"), Some(RecordKind::Texture));
        assert_eq!(RecordKind::detect("# comment"), None);
        assert_eq!(RecordKind::detect(" PRIMITIVE;0"), None);
    }

    #[test]
    fn non_numeric_graphics_level_defaults_to_zero() {
        let line = "SCENEINFO;640;480;high;10;0.5;5000;0.3;0;0.1;0.2;0.3;1;0;0;1;100;0;0";
        let Record::SceneInfo(info) = decode_line(line, RecordKind::SceneInfo) else {
            panic!("wrong kind");
        };
        assert_eq!(info.graphics_level, 0);
        assert_eq!(info.width, 640);
        assert_eq!(info.ray_iterations, 10);
        assert_eq!(info.view_distance, 5000.0);
        assert_eq!(info.background_color, vec4(0.1, 0.2, 0.3, 1.0));
        assert_eq!(info.max_path_tracing_iterations, 100);
    }

    #[test]
    fn trailing_token_fills_last_field() {
        let line = "TEXTURE;3;textures/wood.bmp";
        let Record::Texture(tex) = decode_line(line, RecordKind::Texture) else {
            panic!("wrong kind");
        };
        assert_eq!(tex.slot, 3);
        assert_eq!(tex.path, "textures/wood.bmp");

        // A short line still routes its unterminated tail to the last field.
        let rec: MaterialRecord = decode_fields("MATERIAL;1;0.5;9", "MATERIAL", MATERIAL_FIELDS);
        assert_eq!(rec.color.x, 1.0);
        assert_eq!(rec.color.y, 0.5);
        assert_eq!(rec.texture_mapping.w, 9);
        assert_eq!(rec.color.z, 0.0);
    }

    #[test]
    fn trailing_separator_and_crlf_are_tolerated() {
        let line = "TEXTURE;2;sky.tga;\r\n";
        let Record::Texture(tex) = decode_line(line, RecordKind::Texture) else {
            panic!("wrong kind");
        };
        assert_eq!(tex.slot, 2);
        assert_eq!(tex.path, "sky.tga");
    }

    #[test]
    fn empty_body_yields_default_record() {
        let Record::Texture(tex) = decode_line("TEXTURE", RecordKind::Texture) else {
            panic!("wrong kind");
        };
        assert_eq!(tex, TextureRecord { slot: MATERIAL_NONE, path: String::new() });
    }

    #[test]
    fn primitive_line_fields_land_in_order() {
        let line = "PRIMITIVE;10;1;2;3;4;5;6;7;8;9;0;0;1;0;0;1;0;0;1;1;1;1;4;0;0;0;1;0;0;1;1;0.5";
        let Record::Primitive(p) = decode_line(line, RecordKind::Primitive) else {
            panic!("wrong kind");
        };
        assert_eq!(p.kind, PrimitiveKind::Triangle);
        assert_eq!(p.p0, vec3(1.0, 2.0, 3.0));
        assert_eq!(p.p2, vec3(7.0, 8.0, 9.0));
        assert_eq!(p.n1, vec3(0.0, 0.0, 1.0));
        assert_eq!(p.material_id, 4);
        assert_eq!(p.vt2, vec3(1.0, 1.0, 0.5));
    }

    #[test]
    fn encoded_line_decodes_to_same_record() {
        let material = MaterialRecord {
            color: vec4(0.25, 0.5, 0.75, 1.0),
            reflection: 0.3,
            specular: vec4(1.0, 200.0, 0.0, 0.0),
            transparency: 0.125,
            texture_mapping: corelib::ivec4(0, 0, MATERIAL_NONE, 2),
            ..Default::default()
        };
        let line = encode_line(&Record::Material(material));
        assert!(line.starts_with("MATERIAL;0.25;0.5;0.75;1;"));
        assert!(line.ends_with(";0;0;-1;2\n"));
        assert_eq!(decode_line(&line, RecordKind::Material), Record::Material(material));
    }
}
