use super::{
    Field,
    IdealLoadsSystem,
    IdfError,
    ModelObject,
    RawObject,
    Version,
};
use std::path::Path;

/// A parsed building model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdfDocument {
    objects: Vec<ModelObject>,
    /// Whitespace and comments after the last object.
    trailer: String,
}

impl IdfDocument {
    pub fn from_path(path: &Path) -> Result<Self, IdfError> {
        let text = std::fs::read_to_string(path).map_err(|source| IdfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, IdfError> {
        let mut parser = Parser::new(text);
        let mut objects = Vec::new();
        while let Some(raw) = parser.next_object()? {
            objects.push(ModelObject::from_raw(raw));
        }
        Ok(Self {
            objects,
            trailer: parser.trailer(),
        })
    }

    pub fn objects(&self) -> &[ModelObject] {
        &self.objects
    }

    pub fn into_objects(self) -> (Vec<ModelObject>, String) {
        (self.objects, self.trailer)
    }

    pub fn from_objects(objects: Vec<ModelObject>, trailer: String) -> Self {
        Self { objects, trailer }
    }

    pub fn version(&self) -> Option<(usize, &Version)> {
        self.objects.iter().enumerate().find_map(|(idx, object)| match object {
            ModelObject::Version(version) => Some((idx, version)),
            _ => None,
        })
    }

    pub fn ideal_loads_systems(&self) -> impl Iterator<Item = (usize, &IdealLoadsSystem)> {
        self.objects.iter().enumerate().filter_map(|(idx, object)| match object {
            ModelObject::IdealLoads(system) => Some((idx, system)),
            _ => None,
        })
    }

    /// Looks up an object by class and name, both case-insensitive.
    pub fn find(&self, class: &str, name: &str) -> Option<(usize, &ModelObject)> {
        self.objects.iter().enumerate().find(|(_, object)| {
            let raw = object.raw();
            raw.is_class(class) && raw.name().is_some_and(|own| own.eq_ignore_ascii_case(name))
        })
    }

    /// Looks up a schedule of any `Schedule:*` class by name.
    pub fn find_schedule(&self, name: &str) -> Option<(usize, &ModelObject)> {
        self.objects
            .iter()
            .enumerate()
            .find(|(_, object)| object.is_schedule_named(name))
    }

    pub fn last_index_of(&self, class: &str) -> Option<usize> {
        self.objects.iter().rposition(|object| object.raw().is_class(class))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for object in &self.objects {
            object.raw().render_into(&mut out);
        }
        out.push_str(&self.trailer);
        out
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
    line_counted_to: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
            line_counted_to: 0,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    fn line_at(&mut self, pos: usize) -> usize {
        self.line += self.text[self.line_counted_to..pos].matches('\n').count();
        self.line_counted_to = pos;
        self.line
    }

    fn line_end(&self, from: usize) -> usize {
        self.text[from..].find('\n').map_or(self.text.len(), |offset| from + offset)
    }

    fn trailer(&self) -> String {
        self.text[self.pos..].to_string()
    }

    /// Skips whitespace and `!` comments, returning where the next object starts.
    fn skip_trivia(&self, mut pos: usize) -> usize {
        let bytes = self.bytes();
        while pos < bytes.len() {
            match bytes[pos] {
                b'!' => pos = self.line_end(pos),
                byte if byte.is_ascii_whitespace() => pos += 1,
                _ => break,
            }
        }
        pos
    }

    /// A `!` comment following a field terminator on the same line.
    fn same_line_comment(&self, from: usize) -> Option<(String, usize)> {
        let bytes = self.bytes();
        let mut pos = from;
        while pos < bytes.len() && (bytes[pos] == b' ' || bytes[pos] == b'\t') {
            pos += 1;
        }
        if pos < bytes.len() && bytes[pos] == b'!' {
            let end = self.line_end(pos);
            return Some((self.text[pos..end].trim_end().to_string(), end));
        }
        None
    }

    fn next_object(&mut self) -> Result<Option<RawObject>, IdfError> {
        let body_start = self.skip_trivia(self.pos);
        if body_start == self.text.len() {
            return Ok(None);
        }
        let line = self.line_at(body_start);
        let bytes = self.bytes();

        let mut values: Vec<Field> = Vec::new();
        let mut current = String::new();
        let mut segment = body_start;
        let mut pos = body_start;
        let mut end = None;

        while pos < bytes.len() {
            match bytes[pos] {
                b'!' => {
                    current.push_str(&self.text[segment..pos]);
                    pos = self.line_end(pos);
                    segment = pos;
                }
                terminator @ (b',' | b';') => {
                    current.push_str(&self.text[segment..pos]);
                    pos += 1;
                    let comment = match self.same_line_comment(pos) {
                        Some((comment, after)) => {
                            pos = after;
                            Some(comment)
                        }
                        None => None,
                    };
                    values.push(Field {
                        value: current.trim().to_string(),
                        comment,
                    });
                    current.clear();
                    segment = pos;
                    if terminator == b';' {
                        end = Some(pos);
                        break;
                    }
                }
                _ => pos += 1,
            }
        }

        let Some(end) = end else {
            return Err(IdfError::Parse {
                line,
                reason: "object is not terminated by ';'".to_string(),
            });
        };

        let mut values = values.into_iter();
        let class = values.next().map(|field| field.value).unwrap_or_default();
        if class.is_empty() {
            return Err(IdfError::Parse {
                line,
                reason: "object has no class name".to_string(),
            });
        }

        let leading = self.text[self.pos..body_start].to_string();
        let source = self.text[body_start..end].to_string();
        self.pos = end;
        Ok(Some(RawObject::parsed(class, values.collect(), leading, source, line)))
    }
}
