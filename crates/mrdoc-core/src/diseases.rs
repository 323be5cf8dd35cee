use std::fmt;

pub const NO_INFORMATION: &str = "No disease information available for this classification.";

/// Human-readable information attached to a classifier output class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiseaseRecord {
    pub name: &'static str,
    pub description: &'static str,
}

/// Classifier class index -> disease record. Add further diseases here.
static DISEASES: &[(usize, DiseaseRecord)] = &[(
    838,
    DiseaseRecord {
        name: "Allergy",
        description: "An allergy is an immune response to a foreign substance (allergen) that is not typically harmful to your body. Common allergens include pollen, dust mites, pet dander, and certain foods.",
    },
)];

/// Result of resolving a class index through the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(&'static DiseaseRecord),
    NoInformation,
}

pub fn lookup(class_index: usize) -> Lookup {
    DISEASES
        .iter()
        .find(|(index, _)| *index == class_index)
        .map(|(_, record)| Lookup::Found(record))
        .unwrap_or(Lookup::NoInformation)
}

/// What gets shown after an uploaded image has been classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnosis {
    pub class_index: usize,
    pub outcome: Lookup,
}

impl Diagnosis {
    pub fn from_class(class_index: usize) -> Self {
        Self {
            class_index,
            outcome: lookup(class_index),
        }
    }

    /// Display lines, one per paragraph
    pub fn lines(&self) -> Vec<String> {
        match self.outcome {
            Lookup::Found(record) => vec![
                format!("Predicted Disease: {}", record.name),
                format!("Description: {}", record.description),
            ],
            Lookup::NoInformation => vec![NO_INFORMATION.to_string()],
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}
