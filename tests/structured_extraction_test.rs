use recipe_parser::{extract_structured, extract_structured_with_microdata, TagType};

fn create_recipe_html(json_ld: &str) -> String {
    format!(
        r#"
        <!DOCTYPE html>
        <html>
        <head>
            <title>Recipe Page</title>
            <script type="application/ld+json">
                {json_ld}
            </script>
        </head>
        <body>
            <h1>Recipe</h1>
        </body>
        </html>
        "#
    )
}

const URL: &str = "https://example.com/recipes/black-bean-soup";

#[test]
fn test_lowercase_recipe_type() {
    let json_ld = r#"
    {
        "@context": "https://schema.org",
        "@type": "recipe",
        "name": "Easy Black Bean Soup",
        "image": "https://example.com/blackbean.jpg",
        "description": "This black bean soup recipe is easy to make and full of flavor.",
        "prepTime": "PT10M",
        "cookTime": "PT30M",
        "totalTime": "PT40M",
        "recipeYield": "6",
        "recipeCategory": "Dinner",
        "recipeCuisine": "Mexican",
        "recipeIngredient": [
            "2 cans black beans",
            "1 onion, diced",
            "2 cloves garlic, minced",
            "1 tsp cumin",
            "4 cups vegetable broth",
            "Salt and pepper to taste"
        ],
        "recipeInstructions": [
            "Sauté onion and garlic until soft.",
            "Add cumin and cook for 1 minute.",
            "Add beans and broth, simmer for 20 minutes.",
            "Season with salt and pepper."
        ]
    }
    "#;

    let recipe = extract_structured(&create_recipe_html(json_ld), URL).unwrap();

    assert_eq!(recipe.name, "Easy Black Bean Soup");
    assert_eq!(recipe.source_url.as_deref(), Some(URL));
    assert_eq!((recipe.prep_time, recipe.cook_time, recipe.total_time), (Some(10), Some(30), Some(40)));
    assert_eq!(recipe.servings, Some(6));
    assert_eq!(recipe.images, vec!["https://example.com/blackbean.jpg"]);

    let ingredients = &recipe.ingredient_sections[0].ingredients;
    assert_eq!(ingredients.len(), 6);
    assert_eq!(ingredients[0].quantity, Some(2.0));
    assert_eq!(ingredients[0].unit.as_deref(), Some("can"));
    assert_eq!(ingredients[0].name, "black beans");
    assert_eq!(ingredients[3].unit.as_deref(), Some("teaspoon"));
    assert_eq!(ingredients[5].quantity, None);
    assert_eq!(ingredients[5].name, "Salt and pepper to taste");
    assert!(ingredients.iter().enumerate().all(|(i, ingredient)| ingredient.index == i));

    let steps = &recipe.instruction_sections[0].instructions;
    assert_eq!(steps.len(), 4);
    assert_eq!(steps[0].instruction, "Sauté onion and garlic until soft.");
    assert!(steps.iter().all(|step| step.image_url.is_none()));

    let tags = recipe.suggested_tags.unwrap();
    assert!(tags
        .iter()
        .any(|tag| tag.tag_type == TagType::Cuisine && tag.name == "Mexican"));
    assert!(tags
        .iter()
        .any(|tag| tag.tag_type == TagType::MealType && tag.name == "Dinner"));
}

#[test]
fn test_recipe_without_instructions_is_rejected() {
    let json_ld = r#"
    {
        "@context": "https://schema.org/",
        "@type": "Recipe",
        "name": "Dishoom's House Black Daal",
        "cookTime": "PT5H",
        "recipeIngredient": [
            "300g whole black urad daal",
            "⅔ tsp deggi mirch chilli powder",
            "90ml double cream"
        ],
        "recipeYield": 8
    }
    "#;

    assert!(extract_structured(&create_recipe_html(json_ld), URL).is_none());
}

#[test]
fn test_page_without_json_ld() {
    let html = "<html><body><h1>Soup</h1><p>Just a blog post.</p></body></html>";
    assert!(extract_structured(html, URL).is_none());
}

#[test]
fn test_graph_with_sections_and_step_images() {
    let json_ld = r#"
    {
        "@context": "https://schema.org",
        "@graph": [
            {"@type": "WebSite", "name": "Example Kitchen"},
            {"@type": "WebPage", "name": "Lasagne"},
            {
                "@type": ["Recipe", "NewsArticle"],
                "name": "Lasagne",
                "recipeIngredient": ["500 g beef mince", "1 ½ cups milk", "12 lasagne sheets"],
                "recipeInstructions": [
                    {
                        "@type": "HowToSection",
                        "name": "For the ragù",
                        "itemListElement": [
                            {"@type": "HowToStep", "text": "Brown the mince.", "image": "/img/step1.jpg"},
                            {"@type": "HowToStep", "text": "Simmer with tomatoes for an hour."}
                        ]
                    },
                    {
                        "@type": "HowToSection",
                        "name": "To assemble",
                        "itemListElement": [
                            {"@type": "HowToStep", "text": "Layer sheets, ragù and béchamel."},
                            {"@type": "HowToStep", "text": "Bake for 40 minutes."}
                        ]
                    }
                ]
            }
        ]
    }
    "#;

    let recipe = extract_structured(&create_recipe_html(json_ld), URL).unwrap();

    assert_eq!(recipe.name, "Lasagne");
    assert_eq!(recipe.ingredient_sections[0].ingredients[1].quantity, Some(1.5));
    assert_eq!(recipe.ingredient_sections[0].ingredients[1].unit.as_deref(), Some("cup"));

    let sections = &recipe.instruction_sections;
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].name.as_deref(), Some("For the ragù"));
    assert_eq!(sections[1].name.as_deref(), Some("To assemble"));
    assert_eq!(sections[1].instructions[1].index, 1);
    assert_eq!(
        sections[0].instructions[0].image_url.as_deref(),
        Some("https://example.com/img/step1.jpg")
    );
}

#[test]
fn test_microdata_is_opt_in() {
    let html = r#"
    <html>
    <body>
    <div class="easyrecipe" itemscope itemtype="http://schema.org/Recipe">
        <div itemprop="name">Mom's Famous Banana Bread</div>
        <div itemprop="description">Mom was kind enough to share her famous banana bread recipe with us!</div>
        <img itemprop="image" src="https://example.com/banana-bread.jpg" />
        <time itemprop="prepTime" datetime="PT10M">10 mins</time>
        <time itemprop="cookTime" datetime="PT1H">1 hour</time>
        <span itemprop="recipeYield">12 servings</span>
        <ul>
            <li itemprop="recipeIngredient">5 Tablespoons Butter (room temperature)</li>
            <li itemprop="recipeIngredient">1 Cup White Sugar</li>
            <li itemprop="recipeIngredient">1 Large Egg</li>
        </ul>
        <ol>
            <li itemprop="recipeInstructions">Preheat oven to 350 degrees and heavily grease a 9 inch bread pan.</li>
            <li itemprop="recipeInstructions">Beat butter and sugar until light, fluffy and well blended.</li>
        </ol>
    </div>
    </body>
    </html>
    "#;
    let url = "https://www.cookingdivine.com/recipes/banana-bread/";

    assert!(extract_structured(html, url).is_none());

    let recipe = extract_structured_with_microdata(html, url).unwrap();
    assert_eq!(recipe.name, "Mom's Famous Banana Bread");
    assert_eq!(recipe.prep_time, Some(10));
    assert_eq!(recipe.cook_time, Some(60));
    assert_eq!(recipe.servings, Some(12));
    assert_eq!(recipe.images, vec!["https://example.com/banana-bread.jpg"]);
    assert_eq!(recipe.ingredient_count(), 3);
    assert_eq!(recipe.instruction_count(), 2);
    assert_eq!(
        recipe.ingredient_sections[0].ingredients[0].unit.as_deref(),
        Some("tablespoon")
    );
}
