use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::domain::{BlockData, CatalogKey};

/// Editor-facing field kinds. Resolution never depends on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    RichText,
    Number,
    Boolean,
    Image,
    Color,
    List,
    Object,
    Directive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
        }
    }
}

/// Reusable definition of a block type and variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub key: CatalogKey,
    pub default_data: BlockData,
    #[serde(default)]
    pub field_schema: Vec<FieldDescriptor>,
}

impl CatalogEntry {
    /// Override keys the schema does not declare. An empty schema declares everything.
    pub fn unknown_fields(&self, override_data: &BlockData) -> Vec<String> {
        if self.field_schema.is_empty() {
            return Vec::new();
        }

        override_data
            .keys()
            .filter(|key| !self.field_schema.iter().any(|field| &field.name == *key))
            .cloned()
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog entry {0} is defined more than once")]
    Duplicate(CatalogKey),
}

/// Immutable vocabulary of block types, injected into the resolver per request.
#[derive(Debug, Clone, Default)]
pub struct CatalogRegistry {
    entries: BTreeMap<CatalogKey, CatalogEntry>,
}

impl CatalogRegistry {
    pub fn standard() -> Self {
        let entries = standard_entries()
            .into_iter()
            .map(|entry| (entry.key.clone(), entry))
            .collect();
        Self { entries }
    }

    pub fn from_entries(
        entries: impl IntoIterator<Item = CatalogEntry>,
    ) -> Result<Self, CatalogError> {
        let mut map = BTreeMap::new();
        for entry in entries {
            if map.contains_key(&entry.key) {
                return Err(CatalogError::Duplicate(entry.key));
            }
            map.insert(entry.key.clone(), entry);
        }
        Ok(Self { entries: map })
    }

    pub fn get(&self, key: &CatalogKey) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn entry(
    block_type: &str,
    variant: &str,
    defaults: Value,
    schema: Vec<FieldDescriptor>,
) -> CatalogEntry {
    let default_data = match defaults {
        Value::Object(map) => map,
        _ => BlockData::new(),
    };
    CatalogEntry {
        key: CatalogKey::new(block_type, variant),
        default_data,
        field_schema: schema,
    }
}

fn listing_directive(limit: u32, filters: Value) -> Value {
    json!({
        "kind": "listings",
        "filters": filters,
        "pagination": { "limit": limit, "page": 1 },
        "orderBy": { "field": "publicado", "direction": "desc" }
    })
}

fn standard_entries() -> Vec<CatalogEntry> {
    use FieldKind::*;

    vec![
        entry(
            "header",
            "default",
            json!({ "mostrarLogo": true, "menu": [], "fijo": false }),
            vec![
                FieldDescriptor::new("mostrarLogo", "Mostrar logo", Boolean),
                FieldDescriptor::new("menu", "Menú", List),
                FieldDescriptor::new("fijo", "Fijo al hacer scroll", Boolean),
            ],
        ),
        entry(
            "hero",
            "modern",
            json!({ "titulo": "Bienvenido", "mostrarBadge": true }),
            vec![
                FieldDescriptor::new("titulo", "Título", Text),
                FieldDescriptor::new("subtitulo", "Subtítulo", Text),
                FieldDescriptor::new("mostrarBadge", "Mostrar badge", Boolean),
                FieldDescriptor::new("imagenFondo", "Imagen de fondo", Image),
            ],
        ),
        entry(
            "hero",
            "classic",
            json!({
                "titulo": "Encuentra tu próximo hogar",
                "mostrarBuscador": true,
                "opacidad": 0.4
            }),
            vec![
                FieldDescriptor::new("titulo", "Título", Text),
                FieldDescriptor::new("mostrarBuscador", "Mostrar buscador", Boolean),
                FieldDescriptor::new("opacidad", "Opacidad", Number),
                FieldDescriptor::new("imagenFondo", "Imagen de fondo", Image),
            ],
        ),
        entry(
            "property-grid",
            "cards",
            json!({
                "titulo": "Propiedades destacadas",
                "columnas": 3,
                "dataSource": listing_directive(6, json!({ "destacada": true }))
            }),
            vec![
                FieldDescriptor::new("titulo", "Título", Text),
                FieldDescriptor::new("columnas", "Columnas", Number),
                FieldDescriptor::new("dataSource", "Fuente de datos", Directive),
            ],
        ),
        entry(
            "agents",
            "carousel",
            json!({
                "titulo": "Nuestro equipo",
                "autoplay": false,
                "dataSource": { "kind": "agents", "pagination": { "limit": 8, "page": 1 } }
            }),
            vec![
                FieldDescriptor::new("titulo", "Título", Text),
                FieldDescriptor::new("autoplay", "Autoplay", Boolean),
                FieldDescriptor::new("dataSource", "Fuente de datos", Directive),
            ],
        ),
        entry(
            "testimonials",
            "slider",
            json!({
                "titulo": "Lo que dicen nuestros clientes",
                "intervalo": 0,
                "dataSource": { "kind": "testimonials", "pagination": { "limit": 6, "page": 1 } }
            }),
            vec![
                FieldDescriptor::new("titulo", "Título", Text),
                FieldDescriptor::new("intervalo", "Intervalo (ms)", Number),
                FieldDescriptor::new("dataSource", "Fuente de datos", Directive),
            ],
        ),
        entry(
            "videos",
            "gallery",
            json!({
                "titulo": "Videos",
                "dataSource": { "kind": "videos", "pagination": { "limit": 4, "page": 1 } }
            }),
            vec![
                FieldDescriptor::new("titulo", "Título", Text),
                FieldDescriptor::new("dataSource", "Fuente de datos", Directive),
            ],
        ),
        entry(
            "articles",
            "list",
            json!({
                "titulo": "Blog",
                "mostrarResumen": true,
                "dataSource": {
                    "kind": "articles",
                    "pagination": { "limit": 3, "page": 1 },
                    "orderBy": { "field": "fecha", "direction": "desc" }
                }
            }),
            vec![
                FieldDescriptor::new("titulo", "Título", Text),
                FieldDescriptor::new("mostrarResumen", "Mostrar resumen", Boolean),
                FieldDescriptor::new("dataSource", "Fuente de datos", Directive),
            ],
        ),
        entry(
            "contact",
            "form",
            json!({ "titulo": "Contáctanos", "mostrarMapa": false, "campos": ["nombre", "email", "telefono"] }),
            vec![
                FieldDescriptor::new("titulo", "Título", Text),
                FieldDescriptor::new("mostrarMapa", "Mostrar mapa", Boolean),
                FieldDescriptor::new("campos", "Campos", List),
            ],
        ),
        entry(
            "footer",
            "default",
            json!({ "mostrarRedes": true, "copyright": "", "columnas": 4 }),
            vec![
                FieldDescriptor::new("mostrarRedes", "Mostrar redes", Boolean),
                FieldDescriptor::new("copyright", "Copyright", Text),
                FieldDescriptor::new("columnas", "Columnas", Number),
            ],
        ),
        entry(
            "footer",
            "dark",
            json!({ "mostrarRedes": true, "copyright": "", "fondo": "#111827" }),
            vec![
                FieldDescriptor::new("mostrarRedes", "Mostrar redes", Boolean),
                FieldDescriptor::new("copyright", "Copyright", Text),
                FieldDescriptor::new("fondo", "Color de fondo", Color),
            ],
        ),
    ]
}
