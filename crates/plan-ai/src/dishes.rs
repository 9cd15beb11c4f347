//! Dish knowledge base: recipe suggestions and ingredient consistency rules.

use crate::normalize;
use plan_core::{BusinessType, Ingredient};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// One ingredient line of a canonical recipe.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RecipeLine {
    pub name: &'static str,
    pub quantity: Decimal,
    pub unit: &'static str,
    /// Cost of `quantity`, derived from the pack price.
    pub unit_price: Decimal,
    pub purchase_unit: &'static str,
    /// Price of one `purchase_unit`.
    pub purchase_price: Decimal,
}

impl RecipeLine {
    /// As an editable ingredient; the recipe-quantity cost becomes the
    /// ingredient's purchase price.
    pub fn to_ingredient(&self) -> Ingredient {
        Ingredient {
            name: self.name.to_string(),
            quantity: self.quantity,
            unit: self.unit.to_string(),
            purchase_price: self.unit_price,
            purchase_unit: self.purchase_unit.to_string(),
        }
    }
}

const fn line(
    name: &'static str,
    quantity: Decimal,
    unit: &'static str,
    unit_price: Decimal,
    purchase_unit: &'static str,
    purchase_price: Decimal,
) -> RecipeLine {
    RecipeLine {
        name,
        quantity,
        unit,
        unit_price,
        purchase_unit,
        purchase_price,
    }
}

/// A known dish.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Dish {
    /// Normalized dish name.
    pub name: &'static str,
    pub description: &'static str,
    pub ingredients: &'static [RecipeLine],
}

const OIL_30: RecipeLine = line("Aceite", dec!(30), "ml", dec!(0.18), "l", dec!(6.00));
const SALT_5: RecipeLine = line("Sal", dec!(5), "g", dec!(0.05), "kg", dec!(10.00));
const SALT_3: RecipeLine = line("Sal", dec!(3), "g", dec!(0.03), "kg", dec!(10.00));
const ONION_50: RecipeLine = line("Cebolla", dec!(50), "g", dec!(0.25), "kg", dec!(5.00));
const GARLIC_10: RecipeLine = line("Ajo", dec!(10), "g", dec!(0.20), "kg", dec!(20.00));
const CUMIN_5: RecipeLine = line("Comino", dec!(5), "g", dec!(0.30), "kg", dec!(60.00));
const ACHIOTE_5: RecipeLine = line("Achiote", dec!(5), "g", dec!(0.25), "kg", dec!(50.00));
const RICE_150: RecipeLine = line("Arroz", dec!(150), "g", dec!(0.45), "kg", dec!(3.00));
const PORK_250: RecipeLine = line("Carne de cerdo", dec!(250), "g", dec!(3.75), "kg", dec!(15.00));
const POTATO_PATTY: RecipeLine = line("Tortilla de papa", dec!(100), "g", dec!(0.60), "kg", dec!(6.00));
const PICKLES: RecipeLine = line("Encurtido", dec!(30), "g", dec!(0.30), "kg", dec!(10.00));
const CHEESE_50: RecipeLine = line("Queso", dec!(50), "g", dec!(1.00), "kg", dec!(20.00));
const TOMATO_SAUCE: RecipeLine = line("Salsa de tomate", dec!(100), "ml", dec!(0.30), "l", dec!(3.00));
const WATER: RecipeLine = line("Agua", dec!(200), "ml", dec!(0.00), "l", dec!(0.00));

/// Canonical recipes, matched exactly on the normalized dish name.
pub const DISHES: &[Dish] = &[
    Dish {
        name: "seco de pollo",
        description: "chicken stewed in spices",
        ingredients: &[
            line("Pollo", dec!(300), "g", dec!(4.50), "kg", dec!(15.00)),
            RICE_150, ONION_50, GARLIC_10, CUMIN_5, ACHIOTE_5, OIL_30,
        ],
    },
    Dish {
        name: "seco de chivo",
        description: "marinated goat stew",
        ingredients: &[
            line("Carne de chivo", dec!(300), "g", dec!(6.00), "kg", dec!(20.00)),
            RICE_150, ONION_50, GARLIC_10, CUMIN_5, ACHIOTE_5, OIL_30,
        ],
    },
    Dish {
        name: "ceviche",
        description: "fish cured in lime",
        ingredients: &[
            line("Pescado fresco", dec!(200), "g", dec!(4.00), "kg", dec!(20.00)),
            line("Limón", dec!(100), "ml", dec!(0.40), "kg", dec!(4.00)),
            line("Cebolla roja", dec!(50), "g", dec!(0.30), "kg", dec!(6.00)),
            line("Tomate", dec!(50), "g", dec!(0.25), "kg", dec!(5.00)),
            line("Cilantro", dec!(10), "g", dec!(0.20), "kg", dec!(20.00)),
            SALT_5,
        ],
    },
    Dish {
        name: "encebollado",
        description: "tuna soup with cassava and pickled onion",
        ingredients: &[
            line("Atún", dec!(150), "g", dec!(3.00), "kg", dec!(20.00)),
            line("Yuca", dec!(200), "g", dec!(0.40), "kg", dec!(2.00)),
            line("Cebolla curtida", dec!(50), "g", dec!(0.30), "kg", dec!(6.00)),
            line("Limón", dec!(30), "ml", dec!(0.12), "kg", dec!(4.00)),
            line("Aceite", dec!(20), "ml", dec!(0.12), "l", dec!(6.00)),
            SALT_5,
        ],
    },
    Dish {
        name: "hornado",
        description: "roast pork with potato patties",
        ingredients: &[
            PORK_250, POTATO_PATTY, PICKLES, ACHIOTE_5,
            line("Comino", dec!(3), "g", dec!(0.18), "kg", dec!(60.00)),
        ],
    },
    Dish {
        name: "fritada",
        description: "fried pork with potato patties",
        ingredients: &[
            PORK_250, POTATO_PATTY, PICKLES,
            line("Aceite", dec!(50), "ml", dec!(0.30), "l", dec!(6.00)),
        ],
    },
    Dish {
        name: "llapingacho",
        description: "potato patty with cheese",
        ingredients: &[
            line("Papa", dec!(300), "g", dec!(0.90), "kg", dec!(3.00)),
            CHEESE_50,
            line("Mantequilla", dec!(20), "g", dec!(0.40), "kg", dec!(20.00)),
            OIL_30, SALT_5,
        ],
    },
    Dish {
        name: "empanada",
        description: "fried cheese empanada",
        ingredients: &[
            line("Harina de trigo", dec!(100), "g", dec!(0.30), "kg", dec!(3.00)),
            CHEESE_50,
            line("Aceite", dec!(50), "ml", dec!(0.30), "l", dec!(6.00)),
            SALT_3,
        ],
    },
    Dish {
        name: "humita",
        description: "sweet corn cake with cheese",
        ingredients: &[
            line("Choclo", dec!(200), "g", dec!(0.80), "kg", dec!(4.00)),
            line("Queso", dec!(30), "g", dec!(0.60), "kg", dec!(20.00)),
            line("Mantequilla", dec!(15), "g", dec!(0.30), "kg", dec!(20.00)),
            SALT_3,
        ],
    },
    Dish {
        name: "tamal",
        description: "corn tamale with pork",
        ingredients: &[
            line("Harina de maíz", dec!(150), "g", dec!(0.45), "kg", dec!(3.00)),
            line("Carne de cerdo", dec!(100), "g", dec!(1.50), "kg", dec!(15.00)),
            ACHIOTE_5,
            line("Hojas de plátano", dec!(2), "leaf", dec!(0.20), "dozen", dec!(2.40)),
        ],
    },
    Dish {
        name: "hamburguesa",
        description: "classic beef burger with lettuce, tomato and cheese",
        ingredients: &[
            line("Carne de res", dec!(150), "g", dec!(2.25), "kg", dec!(15.00)),
            line("Pan de hamburguesa", dec!(1), "unit", dec!(0.50), "unit", dec!(0.50)),
            line("Lechuga", dec!(20), "g", dec!(0.20), "kg", dec!(10.00)),
            line("Tomate", dec!(30), "g", dec!(0.15), "kg", dec!(5.00)),
            line("Queso", dec!(25), "g", dec!(0.50), "kg", dec!(20.00)),
            line("Aceite", dec!(15), "ml", dec!(0.09), "l", dec!(6.00)),
        ],
    },
    Dish {
        name: "pizza",
        description: "pizza with tomato sauce, cheese and ham",
        ingredients: &[
            line("Harina de trigo", dec!(200), "g", dec!(0.60), "kg", dec!(3.00)),
            TOMATO_SAUCE,
            line("Queso mozzarella", dec!(100), "g", dec!(2.00), "kg", dec!(20.00)),
            line("Jamón", dec!(50), "g", dec!(1.00), "kg", dec!(20.00)),
            line("Aceite de oliva", dec!(20), "ml", dec!(0.20), "l", dec!(10.00)),
            line("Levadura", dec!(5), "g", dec!(0.10), "kg", dec!(20.00)),
        ],
    },
    Dish {
        name: "pasta",
        description: "pasta with meat and tomato sauce",
        ingredients: &[
            line("Pasta", dec!(150), "g", dec!(0.75), "kg", dec!(5.00)),
            TOMATO_SAUCE,
            line("Carne molida", dec!(100), "g", dec!(1.50), "kg", dec!(15.00)),
            line("Cebolla", dec!(30), "g", dec!(0.15), "kg", dec!(5.00)),
            line("Ajo", dec!(5), "g", dec!(0.10), "kg", dec!(20.00)),
            line("Aceite", dec!(20), "ml", dec!(0.12), "l", dec!(6.00)),
        ],
    },
    Dish {
        name: "ensalada",
        description: "fresh salad with lettuce, tomato and dressing",
        ingredients: &[
            line("Lechuga", dec!(100), "g", dec!(1.00), "kg", dec!(10.00)),
            line("Tomate", dec!(80), "g", dec!(0.40), "kg", dec!(5.00)),
            line("Cebolla", dec!(30), "g", dec!(0.15), "kg", dec!(5.00)),
            line("Aceite de oliva", dec!(15), "ml", dec!(0.15), "l", dec!(10.00)),
            line("Limón", dec!(20), "ml", dec!(0.08), "kg", dec!(4.00)),
            SALT_3,
        ],
    },
    Dish {
        name: "sopa",
        description: "chicken soup with vegetables and noodles",
        ingredients: &[
            line("Caldo de pollo", dec!(300), "ml", dec!(0.90), "l", dec!(3.00)),
            line("Verduras", dec!(100), "g", dec!(0.80), "kg", dec!(8.00)),
            line("Fideos", dec!(50), "g", dec!(0.25), "kg", dec!(5.00)),
            line("Pollo", dec!(80), "g", dec!(1.20), "kg", dec!(15.00)),
            SALT_3,
        ],
    },
    Dish {
        name: "cafe",
        description: "black coffee with sugar",
        ingredients: &[
            line("Café molido", dec!(15), "g", dec!(0.30), "kg", dec!(20.00)),
            WATER,
            line("Azúcar", dec!(10), "g", dec!(0.06), "kg", dec!(6.00)),
        ],
    },
    Dish {
        name: "jugo",
        description: "fresh fruit juice",
        ingredients: &[
            line("Fruta (naranja)", dec!(200), "g", dec!(0.80), "kg", dec!(4.00)),
            line("Azúcar", dec!(15), "g", dec!(0.09), "kg", dec!(6.00)),
            line("Agua", dec!(100), "ml", dec!(0.00), "l", dec!(0.00)),
        ],
    },
];

/// Keyword to dish fallbacks, checked in order.
const DISH_KEYWORDS: &[(&str, &str)] = &[
    ("pollo", "seco de pollo"),
    ("chivo", "seco de chivo"),
    ("pescado", "ceviche"),
    ("atun", "encebollado"),
    ("cerdo", "hornado"),
    ("frita", "fritada"),
    ("papa", "llapingacho"),
    ("empanada", "empanada"),
    ("choclo", "humita"),
    ("maiz", "tamal"),
    ("hamburguesa", "hamburguesa"),
    ("pizza", "pizza"),
    ("pasta", "pasta"),
    ("ensalada", "ensalada"),
    ("sopa", "sopa"),
];

const GENERIC_RESTAURANT: &[RecipeLine] = &[
    line("Ingrediente principal", dec!(200), "g", dec!(3.00), "kg", dec!(15.00)),
    OIL_30,
    SALT_5,
    line("Especias", dec!(10), "g", dec!(0.30), "kg", dec!(30.00)),
];

const GENERIC_CAFE: &[RecipeLine] = &[
    line("Café", dec!(20), "g", dec!(0.40), "kg", dec!(20.00)),
    line("Azúcar", dec!(15), "g", dec!(0.09), "kg", dec!(6.00)),
    line("Leche", dec!(100), "ml", dec!(0.30), "l", dec!(3.00)),
];

const GENERIC_BAKERY: &[RecipeLine] = &[
    line("Harina de trigo", dec!(200), "g", dec!(0.60), "kg", dec!(3.00)),
    line("Levadura", dec!(10), "g", dec!(0.20), "kg", dec!(20.00)),
    line("Azúcar", dec!(20), "g", dec!(0.12), "kg", dec!(6.00)),
    SALT_5,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionConfidence {
    High,
    Medium,
    Low,
}

/// Suggested recipe for a dish name.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DishSuggestion {
    /// False when a generic list was synthesized.
    pub found: bool,
    pub confidence: SuggestionConfidence,
    pub ingredients: &'static [RecipeLine],
    pub description: String,
}

impl DishSuggestion {
    pub fn to_ingredients(&self) -> Vec<Ingredient> {
        self.ingredients.iter().map(RecipeLine::to_ingredient).collect()
    }
}

pub fn find_dish(name: &str) -> Option<&'static Dish> {
    let name = normalize(name);
    DISHES.iter().find(|d| d.name == name)
}

/// Suggest a recipe: exact dish, then keyword, then a generic list for the
/// business type.
///
/// Example:
/// let s = suggest("Seco de Pollo", BusinessType::Restaurant);
/// assert_eq!(s.confidence, SuggestionConfidence::High);
pub fn suggest(dish_name: &str, business_type: BusinessType) -> DishSuggestion {
    let name = normalize(dish_name);
    if let Some(d) = DISHES.iter().find(|d| d.name == name) {
        return DishSuggestion {
            found: true,
            confidence: SuggestionConfidence::High,
            ingredients: d.ingredients,
            description: format!("recognized dish: {}", d.description),
        };
    }
    for (keyword, dish) in DISH_KEYWORDS {
        if !name.contains(keyword) {
            continue;
        }
        if let Some(d) = DISHES.iter().find(|d| d.name == *dish) {
            return DishSuggestion {
                found: true,
                confidence: SuggestionConfidence::Medium,
                ingredients: d.ingredients,
                description: format!("suggested from \"{keyword}\": {}", d.description),
            };
        }
    }
    let ingredients = match business_type {
        BusinessType::Cafe => GENERIC_CAFE,
        BusinessType::Bakery => GENERIC_BAKERY,
        _ => GENERIC_RESTAURANT,
    };
    DishSuggestion {
        found: false,
        confidence: SuggestionConfidence::Low,
        ingredients,
        description: format!("generic {} recipe for {}", business_type.label(), name),
    }
}

/// Required / forbidden ingredient substrings for a dish family.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConsistencyRule {
    pub dish: &'static str,
    /// At least one must appear among the ingredients.
    pub required: &'static [&'static str],
    /// None may appear.
    pub forbidden: &'static [&'static str],
    pub message: &'static str,
}

const RED_AND_WHITE_MEAT: &[&str] = &["carne de res", "pollo", "cerdo", "chivo"];
const NOT_PORK: &[&str] = &["pollo", "carne de res", "res", "vaca", "ternera", "chivo"];
const NO_MEAT: &[&str] = &["carne", "pescado", "pollo", "cerdo"];
const NO_FISH: &[&str] = &["pescado", "atun"];

/// Checked in order; the first rule whose dish key appears in the name applies.
pub const CONSISTENCY_RULES: &[ConsistencyRule] = &[
    ConsistencyRule {
        dish: "seco de pollo",
        required: &["pollo"],
        forbidden: &["carne de res", "res", "vaca", "ternera", "cerdo", "chivo"],
        message: "seco de pollo must contain chicken, not beef",
    },
    ConsistencyRule {
        dish: "seco de chivo",
        required: &["chivo", "carne de chivo"],
        forbidden: &["pollo", "carne de res", "res", "vaca", "ternera"],
        message: "seco de chivo must contain goat, not other meats",
    },
    ConsistencyRule {
        dish: "ceviche",
        required: &["pescado", "limon"],
        forbidden: RED_AND_WHITE_MEAT,
        message: "ceviche must contain fish and lime, not meat",
    },
    ConsistencyRule {
        dish: "encebollado",
        required: &["atun", "yuca"],
        forbidden: RED_AND_WHITE_MEAT,
        message: "encebollado must contain tuna and cassava, not meat",
    },
    ConsistencyRule {
        dish: "hornado",
        required: &["cerdo", "carne de cerdo"],
        forbidden: NOT_PORK,
        message: "hornado must contain pork, not other meats",
    },
    ConsistencyRule {
        dish: "fritada",
        required: &["cerdo", "carne de cerdo"],
        forbidden: NOT_PORK,
        message: "fritada must contain pork, not other meats",
    },
    ConsistencyRule {
        dish: "hamburguesa",
        required: &["carne", "pan"],
        forbidden: &["pescado", "atun", "arroz", "frijoles", "lentejas"],
        message: "a burger must contain meat and bread, not rice, beans or fish",
    },
    ConsistencyRule {
        dish: "pizza",
        required: &["harina", "queso"],
        forbidden: NO_FISH,
        message: "pizza must contain flour and cheese, not fish",
    },
    ConsistencyRule {
        dish: "cafe",
        required: &["cafe"],
        forbidden: NO_MEAT,
        message: "coffee must contain coffee, not meat",
    },
    ConsistencyRule {
        dish: "jugo",
        required: &["fruta", "naranja", "limon"],
        forbidden: NO_MEAT,
        message: "juice must contain fruit, not meat",
    },
    ConsistencyRule {
        dish: "tacos",
        required: &["carne", "tortilla"],
        forbidden: NO_FISH,
        message: "tacos must contain meat and tortilla, not fish",
    },
    ConsistencyRule {
        dish: "burrito",
        required: &["carne", "tortilla"],
        forbidden: NO_FISH,
        message: "a burrito must contain meat and tortilla, not fish",
    },
    ConsistencyRule {
        dish: "sandwich",
        required: &["pan"],
        forbidden: NO_FISH,
        message: "a sandwich must contain bread, not fish",
    },
    ConsistencyRule {
        dish: "ensalada",
        required: &["lechuga", "tomate"],
        forbidden: &[],
        message: "a salad must contain vegetables",
    },
];

/// Outcome of a consistency check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Consistency {
    pub is_consistent: bool,
    pub message: String,
}

impl Consistency {
    fn ok() -> Self {
        Self {
            is_consistent: true,
            message: "consistent".to_string(),
        }
    }

    fn fail(message: String) -> Self {
        Self {
            is_consistent: false,
            message,
        }
    }
}

/// Check ingredient names against the dish's required/forbidden lists.
///
/// Example:
/// let c = check_consistency("Seco de Chivo", &["carne de res", "arroz"]);
/// assert!(!c.is_consistent);
pub fn check_consistency<S: AsRef<str>>(dish_name: &str, ingredient_names: &[S]) -> Consistency {
    let dish = normalize(dish_name);
    let ingredients: Vec<String> = ingredient_names
        .iter()
        .map(|s| normalize(s.as_ref()))
        .collect();
    let present = |needle: &str| ingredients.iter().any(|i| i.contains(needle));

    if let Some(rule) = CONSISTENCY_RULES.iter().find(|r| dish.contains(r.dish)) {
        if !rule.required.iter().any(|r| present(r)) {
            return Consistency::fail(format!(
                "missing required ingredients: {}",
                rule.required.join(", ")
            ));
        }
        let offending: Vec<&str> = rule
            .forbidden
            .iter()
            .copied()
            .filter(|f| present(f))
            .collect();
        if !offending.is_empty() {
            return Consistency::fail(format!(
                "{} (inappropriate ingredients found: {})",
                rule.message,
                offending.join(", ")
            ));
        }
        return Consistency::ok();
    }

    if dish.contains("pollo") && present("carne de res") {
        return Consistency::fail("a chicken dish must not contain beef".to_string());
    }
    if dish.contains("pescado") && present("carne de res") {
        return Consistency::fail("a fish dish must not contain beef".to_string());
    }
    Consistency::ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seco_de_chivo_with_beef_is_inconsistent() {
        let c = check_consistency("Seco de Chivo", &["carne de res", "arroz"]);
        assert!(!c.is_consistent);
        assert!(c.message.starts_with("missing required ingredients: chivo"));
    }

    #[test]
    fn forbidden_ingredients_are_named() {
        let c = check_consistency("Seco de Chivo", &["Carne de chivo", "Pollo"]);
        assert!(!c.is_consistent);
        assert!(c.message.ends_with("(inappropriate ingredients found: pollo)"));
        let c = check_consistency("seco de chivo", &["carne de chivo", "arroz", "comino"]);
        assert!(c.is_consistent);
    }

    #[test]
    fn accents_do_not_matter() {
        assert!(check_consistency("Ceviche de camarón", &["Pescado", "Limón"]).is_consistent);
        assert!(!check_consistency("Encebollado", &["Atún", "Cerdo"]).is_consistent);
        assert!(check_consistency("Café americano", &["café molido", "agua"]).is_consistent);
    }

    #[test]
    fn generic_fallbacks_catch_beef() {
        let c = check_consistency("Arroz con pollo", &["Carne de res", "Arroz"]);
        assert_eq!(c.message, "a chicken dish must not contain beef");
        assert!(!check_consistency("Pescado frito", &["carne de res"]).is_consistent);
        assert!(check_consistency("Tortilla española", &["huevos", "papa"]).is_consistent);
    }

    #[test]
    fn suggestion_confidence_levels() {
        let s = suggest("  Seco de Pollo ", BusinessType::Restaurant);
        assert!(s.found);
        assert_eq!(s.confidence, SuggestionConfidence::High);
        assert_eq!(s.ingredients.len(), 7);
        assert_eq!(s.to_ingredients()[0].purchase_price, dec!(4.50));

        let s = suggest("Alitas de pollo BBQ", BusinessType::Bar);
        assert_eq!(s.confidence, SuggestionConfidence::Medium);
        assert_eq!(s.ingredients[0].name, "Pollo");

        let s = suggest("Croissant", BusinessType::Bakery);
        assert!(!s.found);
        assert_eq!(s.confidence, SuggestionConfidence::Low);
        assert_eq!(s.ingredients[0].name, "Harina de trigo");
        assert_eq!(suggest("Croissant", BusinessType::IceCream).ingredients.len(), 4);
    }

    #[test]
    fn every_dish_is_self_consistent() {
        for d in DISHES {
            let names: Vec<&str> = d.ingredients.iter().map(|l| l.name).collect();
            let c = check_consistency(d.name, &names);
            assert!(c.is_consistent, "{}: {}", d.name, c.message);
            assert_eq!(find_dish(d.name).map(|f| f.name), Some(d.name));
        }
    }
}
