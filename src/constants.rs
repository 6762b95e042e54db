pub const ACCESS_TOKEN_LENGTH: usize = 48;

pub const RECIPE_CATEGORIES: &[(&str, &str)] = &[
    ("appetizer", "Appetizer"),
    ("breakfast", "Breakfast"),
    ("main", "Main course"),
    ("side", "Side dish"),
    ("soup", "Soup"),
    ("salad", "Salad"),
    ("bread", "Bread"),
    ("dessert", "Dessert"),
    ("drink", "Drink"),
    ("sauce", "Sauce"),
];
