use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::ParsedRecipe;

/// One reason a recipe failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Checks the structural invariants of a parsed recipe.
///
/// Servings are intentionally unconstrained; zero or negative values pass.
pub fn validate_recipe(recipe: &ParsedRecipe) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if recipe.name.trim().is_empty() {
        issues.push(ValidationIssue::new("name", "must not be empty"));
    }

    if recipe.ingredient_sections.is_empty() {
        issues.push(ValidationIssue::new(
            "ingredientSections",
            "must contain at least one section",
        ));
    }
    for (s, section) in recipe.ingredient_sections.iter().enumerate() {
        let field = format!("ingredientSections[{s}]");
        if section.ingredients.is_empty() {
            issues.push(ValidationIssue::new(&field, "must contain at least one ingredient"));
        }
        for (i, ingredient) in section.ingredients.iter().enumerate() {
            if ingredient.index != i {
                issues.push(ValidationIssue::new(
                    format!("{field}.ingredients[{i}].index"),
                    format!("expected {i}, found {}", ingredient.index),
                ));
            }
            if ingredient.name.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    format!("{field}.ingredients[{i}].name"),
                    "must not be empty",
                ));
            }
        }
    }

    if recipe.instruction_sections.is_empty() {
        issues.push(ValidationIssue::new(
            "instructionSections",
            "must contain at least one section",
        ));
    }
    for (s, section) in recipe.instruction_sections.iter().enumerate() {
        let field = format!("instructionSections[{s}]");
        if section.instructions.is_empty() {
            issues.push(ValidationIssue::new(&field, "must contain at least one instruction"));
        }
        for (i, step) in section.instructions.iter().enumerate() {
            if step.index != i {
                issues.push(ValidationIssue::new(
                    format!("{field}.instructions[{i}].index"),
                    format!("expected {i}, found {}", step.index),
                ));
            }
            if step.instruction.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    format!("{field}.instructions[{i}].instruction"),
                    "must not be empty",
                ));
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
