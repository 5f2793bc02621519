//! Stamping an overlay page onto every page of a PDF using lopdf

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::{Error, Result};

/// XObject name used for the stamp on each page (suffixed if taken)
const STAMP_NAME: &str = "WmStamp";

/// Stamp the first page of `overlay_path` onto every page of `source_path`
///
/// The overlay page is imported once as a Form XObject. Each source page's
/// existing content is wrapped in `q`/`Q` so its graphics state cannot leak
/// into the stamp, then the stamp is drawn on top. Returns the page count.
///
/// # Example
///
/// ```no_run
/// use media_watermark::pdf::stamp_overlay;
/// use std::path::Path;
///
/// stamp_overlay(
///     Path::new("source.pdf"),
///     Path::new("overlay.pdf"),
///     Path::new("output.pdf")
/// ).expect("Failed to stamp");
/// ```
pub fn stamp_overlay(source_path: &Path, overlay_path: &Path, output_path: &Path) -> Result<usize> {
    for path in [source_path, overlay_path] {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
    }

    let mut source_doc = Document::load(source_path)?;
    let overlay_doc = Document::load(overlay_path)?;

    let overlay_page_id = match overlay_doc.get_pages().values().next() {
        Some(id) => *id,
        None => return Err(Error::EmptyPdf(overlay_path.to_path_buf())),
    };
    if source_doc.get_pages().is_empty() {
        return Err(Error::EmptyPdf(source_path.to_path_buf()));
    }

    let page_count = stamp_document(&mut source_doc, &overlay_doc, overlay_page_id)?;

    source_doc.compress();
    source_doc.save(output_path)?;
    debug!(pages = page_count, output = %output_path.display(), "stamped PDF saved");

    Ok(page_count)
}

/// Stamp one overlay page onto every page of `doc`, in memory
pub fn stamp_document(doc: &mut Document, overlay: &Document, overlay_page_id: ObjectId) -> Result<usize> {
    let xobject_id = import_page_as_xobject(doc, overlay, overlay_page_id)?;

    let push_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let pop_id = doc.add_object(Stream::new(Dictionary::new(), b"Q\n".to_vec()));

    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    for page_id in &page_ids {
        let name = add_xobject_to_page_resources(doc, *page_id, xobject_id)?;

        let (llx, lly) = media_box_origin(doc, *page_id);
        let invoke = format!("q\n1 0 0 1 {} {} cm\n/{} Do\nQ\n", llx, lly, name);
        let stamp_id = doc.add_object(Stream::new(Dictionary::new(), invoke.into_bytes()));

        wrap_and_append_content(doc, *page_id, push_id, pop_id, stamp_id)?;
    }

    Ok(page_ids.len())
}

/// Copy an overlay page and everything its resources reference into `doc`
/// as a Form XObject
fn import_page_as_xobject(doc: &mut Document, overlay: &Document, page_id: ObjectId) -> Result<ObjectId> {
    let content = overlay.get_page_content(page_id)?;

    let resources = inherited_attribute(overlay, page_id, b"Resources")
        .map(|res| resolve(overlay, res).clone())
        .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));
    let media_box = inherited_attribute(overlay, page_id, b"MediaBox")
        .map(|mb| resolve(overlay, mb).clone())
        .unwrap_or_else(|| Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ]));

    // Renumber everything the resources reach so nothing collides with doc
    let mut referenced = BTreeSet::new();
    collect_references(overlay, &resources, &mut referenced);

    let mut id_map: HashMap<ObjectId, ObjectId> = HashMap::new();
    for old_id in &referenced {
        id_map.insert(*old_id, doc.new_object_id());
    }
    for old_id in &referenced {
        if let Ok(object) = overlay.get_object(*old_id) {
            doc.objects.insert(id_map[old_id], renumber_object_references(object, &id_map));
        }
    }

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("FormType", Object::Integer(1));
    xobject_dict.set("BBox", media_box);
    xobject_dict.set("Resources", renumber_object_references(&resources, &id_map));

    Ok(doc.add_object(Stream::new(xobject_dict, content)))
}

/// Walk a page and its ancestors for an inheritable attribute
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_object(page_id).ok()?.as_dict().ok()?;
    // Bounded walk guards against malformed Parent cycles
    for _ in 0..32 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_object(parent_id).ok()?.as_dict().ok()?;
    }
    None
}

/// Follow a reference to its target, leaving direct objects as they are
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

fn media_box_origin(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let number = |o: &Object| match o {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    };

    inherited_attribute(doc, page_id, b"MediaBox")
        .map(|mb| resolve(doc, mb))
        .and_then(|mb| mb.as_array().ok())
        .and_then(|arr| Some((number(arr.first()?)?, number(arr.get(1)?)?)))
        .unwrap_or((0.0, 0.0))
}

/// Collect every object id reachable from `object`
fn collect_references(doc: &Document, object: &Object, seen: &mut BTreeSet<ObjectId>) {
    match object {
        Object::Reference(id) => {
            if seen.insert(*id) {
                if let Ok(target) = doc.get_object(*id) {
                    collect_references(doc, target, seen);
                }
            }
        }
        Object::Array(arr) => {
            for item in arr {
                collect_references(doc, item, seen);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect_references(doc, value, seen);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect_references(doc, value, seen);
            }
        }
        _ => {}
    }
}

/// Renumber all object references in an object
fn renumber_object_references(object: &Object, id_map: &HashMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(old_id) => Object::Reference(*id_map.get(old_id).unwrap_or(old_id)),
        Object::Array(arr) => {
            Object::Array(arr.iter().map(|obj| renumber_object_references(obj, id_map)).collect())
        }
        Object::Dictionary(dict) => Object::Dictionary(renumber_dictionary(dict, id_map)),
        Object::Stream(stream) => {
            let mut stream = stream.clone();
            stream.dict = renumber_dictionary(&stream.dict, id_map);
            Object::Stream(stream)
        }
        _ => object.clone(),
    }
}

fn renumber_dictionary(dict: &Dictionary, id_map: &HashMap<ObjectId, ObjectId>) -> Dictionary {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), renumber_object_references(value, id_map));
    }
    new_dict
}

/// Register the stamp XObject in the page's own Resources.
///
/// Inherited or indirect resources are copied onto the page so other pages
/// sharing them are unaffected. Returns the name the stamp was registered under.
fn add_xobject_to_page_resources(doc: &mut Document, page_id: ObjectId, xobject_id: ObjectId) -> Result<String> {
    let mut resources = inherited_attribute(doc, page_id, b"Resources")
        .map(|res| resolve(doc, res))
        .and_then(|res| res.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    let mut xobjects = resources
        .get(b"XObject")
        .ok()
        .map(|xo| resolve(doc, xo))
        .and_then(|xo| xo.as_dict().ok())
        .cloned()
        .unwrap_or_else(Dictionary::new);

    let mut name = STAMP_NAME.to_string();
    let mut suffix = 1;
    while xobjects.has(name.as_bytes()) {
        name = format!("{}{}", STAMP_NAME, suffix);
        suffix += 1;
    }

    xobjects.set(name.as_bytes().to_vec(), Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page_dict.set("Resources", Object::Dictionary(resources));

    Ok(name)
}

/// Wrap existing page content in q/Q and append the stamp stream
fn wrap_and_append_content(
    doc: &mut Document,
    page_id: ObjectId,
    push_id: ObjectId,
    pop_id: ObjectId,
    stamp_id: ObjectId,
) -> Result<()> {
    let existing: Vec<Object> = {
        let page_dict = doc.get_object(page_id)?.as_dict()?;
        match page_dict.get(b"Contents").ok() {
            Some(Object::Reference(id)) => match doc.get_object(*id) {
                // An indirect array of streams is flattened into the page
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Some(Object::Array(arr)) => arr.clone(),
            _ => vec![],
        }
    };

    let mut contents = Vec::with_capacity(existing.len() + 3);
    if !existing.is_empty() {
        contents.push(Object::Reference(push_id));
        contents.extend(existing);
        contents.push(Object::Reference(pop_id));
    }
    contents.push(Object::Reference(stamp_id));

    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page_dict.set("Contents", Object::Array(contents));

    Ok(())
}
