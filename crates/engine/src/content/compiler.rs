use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::app::{Aabb, LevelId, Vec2};

use super::types::{
    ContentError, ContentErrorCode, DeliveryPointDef, GateDef, HazardDef, LevelDef, PlacementDef,
    SourceLocation,
};

const DEFAULT_REQUIRED_ITEMS: u32 = 1;

/// Reads and parses every file in order, then checks that level ids are unique
/// and that each gate points at a level that exists.
pub fn compile_level_files(xml_files: &[PathBuf]) -> Result<Vec<LevelDef>, ContentError> {
    let mut levels = Vec::<LevelDef>::new();
    let mut defined_in = BTreeMap::<LevelId, PathBuf>::new();

    for file_path in xml_files {
        let raw = fs::read_to_string(file_path).map_err(|source| ContentError {
            code: ContentErrorCode::ReadFile,
            message: format!("failed to read XML file: {source}"),
            file_path: file_path.clone(),
            location: None,
        })?;
        for level in parse_levels_document(file_path, &raw)? {
            if let Some(first_path) = defined_in.get(&level.id) {
                return Err(ContentError {
                    code: ContentErrorCode::DuplicateLevel,
                    message: format!(
                        "level '{}' is already defined in {}",
                        level.id,
                        first_path.display()
                    ),
                    file_path: file_path.clone(),
                    location: None,
                });
            }
            defined_in.insert(level.id.clone(), file_path.clone());
            levels.push(level);
        }
    }

    for level in &levels {
        let Some(gate) = &level.gate else {
            continue;
        };
        if !defined_in.contains_key(&gate.next_level) {
            return Err(ContentError {
                code: ContentErrorCode::UnknownGateTarget,
                message: format!(
                    "gate in level '{}' targets unknown level '{}'",
                    level.id, gate.next_level
                ),
                file_path: defined_in.get(&level.id).cloned().unwrap_or_default(),
                location: None,
            });
        }
    }

    Ok(levels)
}

/// Parses one `<Levels>` document. Cross-file checks (duplicate ids, gate
/// targets) happen when the database is assembled.
pub fn parse_levels_document(file_path: &Path, raw: &str) -> Result<Vec<LevelDef>, ContentError> {
    let doc = Document::parse(raw).map_err(|error| ContentError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Levels" {
        return Err(error_at_node(
            ContentErrorCode::InvalidRoot,
            "root element must be <Levels>".to_string(),
            file_path,
            &doc,
            root,
        ));
    }

    let mut levels = Vec::<LevelDef>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "LevelDef" {
            return Err(error_at_node(
                ContentErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; only <LevelDef> is allowed",
                    child.tag_name().name()
                ),
                file_path,
                &doc,
                child,
            ));
        }
        levels.push(parse_level_def(file_path, &doc, child)?);
    }

    Ok(levels)
}

fn parse_level_def(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<LevelDef, ContentError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut id: Option<LevelId> = None;
    let mut label: Option<String> = None;
    let mut move_speed: Option<f32> = None;
    let mut bounds: Option<Aabb> = None;
    let mut spawn: Option<Vec2> = None;
    let mut platforms = Vec::<Aabb>::new();
    let mut collectibles = Vec::<PlacementDef>::new();
    let mut delivery_points = Vec::<DeliveryPointDef>::new();
    let mut hazard: Option<HazardDef> = None;
    let mut gate: Option<GateDef> = None;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in <LevelDef>", field_name),
                file_path,
                doc,
                field,
            ));
        }

        match field_name.as_str() {
            "id" => {
                id = Some(LevelId::new(required_text(file_path, doc, field, "id")?));
            }
            "label" => {
                label = Some(required_text(file_path, doc, field, "label")?);
            }
            "moveSpeed" => {
                let value = required_text(file_path, doc, field, "moveSpeed")?;
                let parsed = value.parse::<f32>().map_err(|_| {
                    error_at_node(
                        ContentErrorCode::InvalidValue,
                        format!("moveSpeed '{}' is not a valid number", value),
                        file_path,
                        doc,
                        field,
                    )
                })?;
                if !parsed.is_finite() || parsed <= 0.0 {
                    return Err(error_at_node(
                        ContentErrorCode::InvalidValue,
                        "moveSpeed must be finite and > 0".to_string(),
                        file_path,
                        doc,
                        field,
                    ));
                }
                move_speed = Some(parsed);
            }
            "bounds" => {
                bounds = Some(rect_attrs(file_path, doc, field)?);
            }
            "spawn" => {
                spawn = Some(Vec2 {
                    x: attr_f32(file_path, doc, field, "x")?,
                    y: attr_f32(file_path, doc, field, "y")?,
                });
            }
            "platforms" => {
                for child in list_children(file_path, doc, field, "platform")? {
                    platforms.push(rect_attrs(file_path, doc, child)?);
                }
            }
            "collectibles" => {
                for child in list_children(file_path, doc, field, "item")? {
                    collectibles.push(PlacementDef {
                        name: required_attr(file_path, doc, child, "name")?,
                        area: rect_attrs(file_path, doc, child)?,
                    });
                }
            }
            "deliveryPoints" => {
                for child in list_children(file_path, doc, field, "point")? {
                    let required_items = match child.attribute("requiredItems") {
                        Some(_) => {
                            let value = attr_f32(file_path, doc, child, "requiredItems")?;
                            if value < 1.0 || value.fract() != 0.0 {
                                return Err(error_at_node(
                                    ContentErrorCode::InvalidValue,
                                    "requiredItems must be a whole number >= 1".to_string(),
                                    file_path,
                                    doc,
                                    child,
                                ));
                            }
                            value as u32
                        }
                        None => DEFAULT_REQUIRED_ITEMS,
                    };
                    delivery_points.push(DeliveryPointDef {
                        name: required_attr(file_path, doc, child, "name")?,
                        area: rect_attrs(file_path, doc, child)?,
                        required_items,
                    });
                }
            }
            "hazard" => {
                let area = rect_attrs(file_path, doc, field)?;
                let shallow_depth = attr_f32(file_path, doc, field, "shallowDepth")?;
                if shallow_depth <= 0.0 || shallow_depth > area.height() {
                    return Err(error_at_node(
                        ContentErrorCode::InvalidValue,
                        "shallowDepth must be > 0 and no deeper than the hazard height".to_string(),
                        file_path,
                        doc,
                        field,
                    ));
                }
                hazard = Some(HazardDef {
                    area,
                    shallow_depth,
                });
            }
            "gate" => {
                gate = Some(GateDef {
                    area: rect_attrs(file_path, doc, field)?,
                    next_level: LevelId::new(required_attr(file_path, doc, field, "nextLevel")?),
                });
            }
            _ => {
                return Err(error_at_node(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in <LevelDef>", field_name),
                    file_path,
                    doc,
                    field,
                ))
            }
        }
    }

    let missing = |name: &str| {
        error_at_node(
            ContentErrorCode::MissingField,
            format!("missing required field <{}> in <LevelDef>", name),
            file_path,
            doc,
            node,
        )
    };
    let id = id.ok_or_else(|| missing("id"))?;
    let label = label.ok_or_else(|| missing("label"))?;
    let move_speed = move_speed.ok_or_else(|| missing("moveSpeed"))?;
    let bounds = bounds.ok_or_else(|| missing("bounds"))?;
    let spawn = spawn.ok_or_else(|| missing("spawn"))?;

    if !bounds.contains_point(spawn) {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!("spawn ({}, {}) lies outside the level bounds", spawn.x, spawn.y),
            file_path,
            doc,
            node,
        ));
    }

    let items_required: u64 = delivery_points
        .iter()
        .map(|point| u64::from(point.required_items))
        .sum();
    if items_required > collectibles.len() as u64 {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!(
                "delivery points require {} items but only {} collectibles exist",
                items_required,
                collectibles.len()
            ),
            file_path,
            doc,
            node,
        ));
    }

    Ok(LevelDef {
        id,
        label,
        move_speed,
        bounds,
        spawn,
        platforms,
        collectibles,
        delivery_points,
        hazard,
        gate,
    })
}

fn list_children<'a, 'input>(
    file_path: &Path,
    doc: &Document<'_>,
    container: Node<'a, 'input>,
    child_name: &str,
) -> Result<Vec<Node<'a, 'input>>, ContentError> {
    let mut children = Vec::new();
    for child in container.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != child_name {
            return Err(error_at_node(
                ContentErrorCode::UnknownField,
                format!(
                    "unexpected <{}> in <{}>; expected <{}>",
                    child.tag_name().name(),
                    container.tag_name().name(),
                    child_name
                ),
                file_path,
                doc,
                child,
            ));
        }
        children.push(child);
    }
    Ok(children)
}

fn rect_attrs(file_path: &Path, doc: &Document<'_>, node: Node<'_, '_>) -> Result<Aabb, ContentError> {
    let x = attr_f32(file_path, doc, node, "x")?;
    let y = attr_f32(file_path, doc, node, "y")?;
    let width = attr_f32(file_path, doc, node, "width")?;
    let height = attr_f32(file_path, doc, node, "height")?;
    if width <= 0.0 || height <= 0.0 {
        return Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!(
                "<{}> width and height must be > 0",
                node.tag_name().name()
            ),
            file_path,
            doc,
            node,
        ));
    }
    Ok(Aabb::from_top_left_size(x, y, width, height))
}

fn attr_f32(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    attr: &str,
) -> Result<f32, ContentError> {
    let value = required_attr(file_path, doc, node, attr)?;
    match value.parse::<f32>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(error_at_node(
            ContentErrorCode::InvalidValue,
            format!(
                "attribute {}='{}' on <{}> is not a finite number",
                attr,
                value,
                node.tag_name().name()
            ),
            file_path,
            doc,
            node,
        )),
    }
}

fn required_attr(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    attr: &str,
) -> Result<String, ContentError> {
    let value = node.attribute(attr).map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            format!(
                "missing attribute '{}' on <{}>",
                attr,
                node.tag_name().name()
            ),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value.to_string())
}

fn required_text(
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, ContentError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            ContentErrorCode::MissingField,
            format!("field <{}> must not be empty", field_name),
            file_path,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn error_at_node(
    code: ContentErrorCode,
    message: String,
    file_path: &Path,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> ContentError {
    let pos = doc.text_pos_at(node.range().start);
    ContentError {
        code,
        message,
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const VALID: &str = r#"<Levels>
  <LevelDef>
    <id>delivery</id>
    <label>Milk Run</label>
    <moveSpeed>320</moveSpeed>
    <bounds x="0" y="0" width="1000" height="500"/>
    <spawn x="50" y="400"/>
    <platforms>
      <platform x="0" y="450" width="1000" height="50"/>
    </platforms>
    <collectibles>
      <item name="milk1" x="100" y="400" width="20" height="30"/>
      <item name="milk2" x="180" y="400" width="20" height="30"/>
      <item name="milk3" x="460" y="400" width="20" height="30"/>
    </collectibles>
    <deliveryPoints>
      <point name="sign" x="300" y="380" width="40" height="70"/>
      <point name="house" x="600" y="300" width="150" height="150" requiredItems="2"/>
    </deliveryPoints>
    <hazard x="0" y="470" width="1000" height="30" shallowDepth="10"/>
    <gate x="900" y="350" width="60" height="100" nextLevel="delivery2"/>
  </LevelDef>
</Levels>"#;

    fn parse(raw: &str) -> Result<Vec<LevelDef>, ContentError> {
        parse_levels_document(Path::new("levels/test.xml"), raw)
    }

    #[test]
    fn parses_full_level_def() {
        let levels = parse(VALID).expect("valid");
        assert_eq!(levels.len(), 1);
        let level = &levels[0];
        assert_eq!(level.id, LevelId::new("delivery"));
        assert_eq!(level.move_speed, 320.0);
        assert_eq!(level.spawn, Vec2 { x: 50.0, y: 400.0 });
        assert_eq!(level.platforms.len(), 1);
        assert_eq!(level.collectibles[0].name, "milk1");
        assert_eq!(level.collectibles[0].area.max, Vec2 { x: 120.0, y: 430.0 });
        assert_eq!(level.delivery_points[0].required_items, 1);
        assert_eq!(level.delivery_points[1].required_items, 2);
        let hazard = level.hazard.expect("hazard");
        assert_eq!(hazard.area.min.y, 470.0);
        assert_eq!(hazard.shallow_depth, 10.0);
        assert_eq!(
            level.gate.as_ref().map(|gate| gate.next_level.clone()),
            Some(LevelId::new("delivery2"))
        );
    }

    #[test]
    fn hazard_and_gate_are_optional() {
        let raw = r#"<Levels><LevelDef>
            <id>plain</id><label>Plain</label><moveSpeed>100</moveSpeed>
            <bounds x="0" y="0" width="10" height="10"/><spawn x="5" y="5"/>
        </LevelDef></Levels>"#;
        let levels = parse(raw).expect("valid");
        assert!(levels[0].hazard.is_none());
        assert!(levels[0].gate.is_none());
        assert!(levels[0].collectibles.is_empty());
    }

    #[test]
    fn malformed_xml_reports_location() {
        let error = parse("<Levels><LevelDef></Levels>").expect_err("malformed");
        assert_eq!(error.code, ContentErrorCode::XmlMalformed);
        assert!(error.location.is_some());
    }

    #[test]
    fn wrong_root_is_rejected() {
        let error = parse("<Defs/>").expect_err("root");
        assert_eq!(error.code, ContentErrorCode::InvalidRoot);
    }

    #[test]
    fn unknown_def_type_is_rejected() {
        let error = parse("<Levels><EntityDef/></Levels>").expect_err("def type");
        assert_eq!(error.code, ContentErrorCode::UnknownDefType);
    }

    #[test]
    fn missing_required_field_is_reported() {
        let raw = VALID.replace("<label>Milk Run</label>", "");
        let error = parse(&raw).expect_err("missing label");
        assert_eq!(error.code, ContentErrorCode::MissingField);
        assert!(error.message.contains("<label>"));
    }

    #[test]
    fn duplicate_field_is_reported_with_line() {
        let raw = VALID.replace(
            "<moveSpeed>320</moveSpeed>",
            "<moveSpeed>320</moveSpeed>\n    <moveSpeed>10</moveSpeed>",
        );
        let error = parse(&raw).expect_err("duplicate");
        assert_eq!(error.code, ContentErrorCode::DuplicateField);
        assert_eq!(error.location.map(|loc| loc.line), Some(6));
    }

    #[test]
    fn unknown_field_and_unexpected_list_child_are_rejected() {
        let raw = VALID.replace("<label>Milk Run</label>", "<label>Milk Run</label><music/>");
        assert_eq!(parse(&raw).expect_err("unknown").code, ContentErrorCode::UnknownField);

        let raw = VALID.replace(
            "<platform x=\"0\"",
            "<item x=\"0\"",
        );
        assert_eq!(parse(&raw).expect_err("list child").code, ContentErrorCode::UnknownField);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let raw = VALID.replace("<moveSpeed>320</moveSpeed>", "<moveSpeed>fast</moveSpeed>");
        assert_eq!(parse(&raw).expect_err("speed").code, ContentErrorCode::InvalidValue);

        let raw = VALID.replace("width=\"20\" height=\"30\"", "width=\"0\" height=\"30\"");
        assert_eq!(parse(&raw).expect_err("size").code, ContentErrorCode::InvalidValue);

        let raw = VALID.replace("requiredItems=\"2\"", "requiredItems=\"1.5\"");
        assert_eq!(parse(&raw).expect_err("items").code, ContentErrorCode::InvalidValue);

        let raw = VALID.replace("shallowDepth=\"10\"", "shallowDepth=\"40\"");
        assert_eq!(parse(&raw).expect_err("depth").code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn more_required_items_than_collectibles_is_rejected() {
        let raw = VALID.replace("requiredItems=\"2\"", "requiredItems=\"3\"");
        let error = parse(&raw).expect_err("unwinnable");
        assert_eq!(error.code, ContentErrorCode::InvalidValue);
        assert!(error.message.contains("require 4 items"));

        let raw = VALID.replace("requiredItems=\"2\"", "requiredItems=\"4294967296\"");
        assert_eq!(parse(&raw).expect_err("huge").code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn spawn_outside_bounds_is_rejected() {
        let raw = VALID.replace("<spawn x=\"50\" y=\"400\"/>", "<spawn x=\"-5\" y=\"400\"/>");
        let error = parse(&raw).expect_err("spawn");
        assert_eq!(error.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn missing_attribute_names_the_attribute() {
        let raw = VALID.replace(" nextLevel=\"delivery2\"", "");
        let error = parse(&raw).expect_err("gate target");
        assert_eq!(error.code, ContentErrorCode::MissingField);
        assert!(error.message.contains("nextLevel"));
    }

    fn single_level(id: &str, gate_target: Option<&str>) -> String {
        let gate = gate_target
            .map(|target| {
                format!(
                    r#"<gate x="10" y="10" width="5" height="5" nextLevel="{target}"/>"#
                )
            })
            .unwrap_or_default();
        format!(
            r#"<Levels><LevelDef>
                <id>{id}</id><label>{id}</label><moveSpeed>100</moveSpeed>
                <bounds x="0" y="0" width="100" height="100"/><spawn x="5" y="5"/>
                {gate}
            </LevelDef></Levels>"#
        )
    }

    #[test]
    fn compile_links_levels_across_files() {
        let temp = TempDir::new().expect("temp");
        let a = temp.path().join("a.xml");
        let b = temp.path().join("b.xml");
        fs::write(&a, single_level("a", Some("b"))).expect("write a");
        fs::write(&b, single_level("b", Some("a"))).expect("write b");

        let levels = compile_level_files(&[a, b]).expect("compile");
        let ids: Vec<&str> = levels.iter().map(|level| level.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn compile_rejects_duplicate_level_ids() {
        let temp = TempDir::new().expect("temp");
        let a = temp.path().join("a.xml");
        let b = temp.path().join("b.xml");
        fs::write(&a, single_level("same", None)).expect("write a");
        fs::write(&b, single_level("same", None)).expect("write b");

        let error = compile_level_files(&[a, b.clone()]).expect_err("duplicate");
        assert_eq!(error.code, ContentErrorCode::DuplicateLevel);
        assert_eq!(error.file_path, b);
    }

    #[test]
    fn compile_rejects_unknown_gate_target() {
        let temp = TempDir::new().expect("temp");
        let a = temp.path().join("a.xml");
        fs::write(&a, single_level("a", Some("nowhere"))).expect("write a");

        let error = compile_level_files(&[a]).expect_err("gate target");
        assert_eq!(error.code, ContentErrorCode::UnknownGateTarget);
        assert!(error.message.contains("nowhere"));
    }

    #[test]
    fn compile_reports_unreadable_file() {
        let temp = TempDir::new().expect("temp");
        let missing = temp.path().join("missing.xml");
        let error = compile_level_files(&[missing]).expect_err("read");
        assert_eq!(error.code, ContentErrorCode::ReadFile);
    }
}
