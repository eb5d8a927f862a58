//! End-to-end runs of the engine over saved HTML

use std::sync::Arc;

use brand_crawler::crawling::CrawlError;
use brand_crawler::domain::{DetailSelectors, PaginationSelectors, ProductDataSelectors};
use brand_crawler::infrastructure::config::EngineConfig;
use brand_crawler::{
    CategoryInfo, CrawlStrategyKind, Crawler, CrawlerDefinition, CrawlerOptions, NutritionInfo,
    PaginationKind, Registry, RunAllOptions, SelectorConfig, SiteConfig, StaticSite,
    StaticSiteDriver, TestModeConfig,
};

const BASE: &str = "https://cafe.test";

fn site_config(brand: &str, start_url: &str) -> SiteConfig {
    SiteConfig {
        brand: brand.to_string(),
        base_url: BASE.to_string(),
        start_url: start_url.to_string(),
        ..SiteConfig::default()
    }
}

fn item_selectors() -> SelectorConfig {
    SelectorConfig {
        product_containers: vec!["li.item".to_string()],
        product_data: ProductDataSelectors {
            name: ".title".to_string(),
            ..ProductDataSelectors::default()
        },
        ..SelectorConfig::default()
    }
}

fn no_settle() -> CrawlerOptions {
    CrawlerOptions {
        settle_delay_ms: 0,
        ..CrawlerOptions::default()
    }
}

fn crawler(definition: CrawlerDefinition, site: StaticSite, test_mode: TestModeConfig) -> Crawler {
    Crawler::new(definition, Arc::new(StaticSiteDriver::new(Arc::new(site)))).with_test_mode(test_mode)
}

#[tokio::test]
async fn container_without_name_is_dropped() {
    let site = StaticSite::new().with_page(
        "https://cafe.test/menu",
        r#"<ul>
             <li class="item"><span class="title">Americano</span><img src="/a.png"></li>
             <li class="item"><img src="/b.png"></li>
           </ul>"#,
    );
    let definition = CrawlerDefinition::new(site_config("mega", "https://cafe.test/menu"), item_selectors());

    let report = crawler(definition, site, TestModeConfig::disabled())
        .run_with_stats()
        .await
        .unwrap();

    assert_eq!(report.products.len(), 1);
    let product = &report.products[0];
    assert_eq!(product.name, "Americano");
    assert_eq!(product.image_url, "https://cafe.test/a.png");
    assert_eq!(product.external_id, "mega_americano");
    assert_eq!(product.external_url, "https://cafe.test/menu");
    assert_eq!(report.stats.items_skipped, 1);
    assert_eq!(report.stats.requests_handled, 1);
}

#[tokio::test]
async fn load_more_clicks_once_in_test_mode() {
    let items: String = (0..8)
        .map(|i| format!(r#"<li class="item"><span class="title">Drink {i}</span></li>"#))
        .collect();
    let site = Arc::new(StaticSite::new().with_page(
        "https://cafe.test/menu",
        format!(r#"<ul>{items}</ul><button class="more">More</button>"#),
    ));

    let mut selectors = item_selectors();
    selectors.pagination = PaginationSelectors {
        load_more: Some("button.more".to_string()),
        ..PaginationSelectors::default()
    };
    let definition = CrawlerDefinition::new(site_config("paik", "https://cafe.test/menu"), selectors)
        .with_pagination(PaginationKind::LoadMore)
        .with_options(no_settle());

    let products = Crawler::new(definition, Arc::new(StaticSiteDriver::new(Arc::clone(&site))))
        .with_test_mode(TestModeConfig::enabled(3, 20))
        .run()
        .await
        .unwrap();

    assert_eq!(site.click_count(), 1);
    assert_eq!(products.len(), 3);
    assert_eq!(products[0].name, "Drink 0");
}

#[tokio::test]
async fn load_more_is_bounded_without_test_mode() {
    let site = Arc::new(StaticSite::new().with_page(
        "https://cafe.test/menu",
        r#"<ul><li class="item"><span class="title">Tea</span></li></ul><button class="more">More</button>"#,
    ));
    let mut selectors = item_selectors();
    selectors.pagination.load_more = Some("button.more".to_string());
    let definition = CrawlerDefinition::new(site_config("paik", "https://cafe.test/menu"), selectors)
        .with_pagination(PaginationKind::LoadMore)
        .with_options(no_settle());

    Crawler::new(definition, Arc::new(StaticSiteDriver::new(Arc::clone(&site))))
        .with_test_mode(TestModeConfig::disabled())
        .run()
        .await
        .unwrap();

    assert_eq!(site.click_count(), 20);
}

fn category_site() -> StaticSite {
    StaticSite::new()
        .with_page(
            "https://cafe.test/",
            r#"<nav>
                 <a class="cat" href="/coffee">Coffee</a>
                 <a class="cat" href="/broken">Broken</a>
                 <a class="cat" href="/tea">Tea</a>
               </nav>"#,
        )
        .with_page(
            "https://cafe.test/coffee",
            r#"<ul><li class="item"><span class="title">Latte</span></li>
                   <li class="item"><span class="title">Mocha</span></li></ul>"#,
        )
        .with_page(
            "https://cafe.test/tea",
            r#"<ul><li class="item"><span class="title">Earl Grey</span></li></ul>"#,
        )
}

fn category_definition() -> CrawlerDefinition {
    let mut selectors = item_selectors();
    selectors.category_links = Some("a.cat".to_string());
    CrawlerDefinition::new(site_config("ediya", "https://cafe.test/"), selectors)
}

#[tokio::test]
async fn inline_data_visits_categories_and_survives_failures() {
    let report = crawler(category_definition(), category_site(), TestModeConfig::disabled())
        .run_with_stats()
        .await
        .unwrap();

    let names: Vec<_> = report.products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Latte", "Mocha", "Earl Grey"]);
    assert_eq!(report.products[0].external_category, "Coffee");
    assert_eq!(report.products[0].external_id, "ediya_coffee_latte");
    assert_eq!(report.products[2].external_url, "https://cafe.test/tea");
    assert_eq!(report.stats.categories_failed, 1);
}

#[tokio::test]
async fn test_mode_limits_categories_and_products() {
    let products = crawler(
        category_definition(),
        category_site(),
        TestModeConfig::enabled(1, 20),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "Latte");
}

#[tokio::test]
async fn explicit_category_urls_replace_discovery() {
    let mut definition = category_definition();
    definition.site.category_urls = vec![CategoryInfo::new("Tea", "https://cafe.test/tea")];

    let products = crawler(definition, category_site(), TestModeConfig::disabled())
        .run()
        .await
        .unwrap();

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].external_category, "Tea");
}

#[tokio::test]
async fn repeated_runs_give_equal_products() {
    let crawler = crawler(category_definition(), category_site(), TestModeConfig::disabled());
    let first = crawler.run().await.unwrap();
    let second = crawler.run().await.unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn next_button_pagination_reads_every_page() {
    let site = StaticSite::new()
        .with_page(
            "https://cafe.test/menu?page=1",
            r#"<ul><li class="item"><span class="title">Page One</span></li></ul>
               <a class="next" href="/menu?page=2">Next</a>"#,
        )
        .with_page(
            "https://cafe.test/menu?page=2",
            r#"<ul><li class="item"><span class="title">Page Two</span></li></ul>
               <a class="next disabled" href="/menu?page=3">Next</a>"#,
        );
    let mut selectors = item_selectors();
    selectors.pagination.next_button = Some("a.next".to_string());
    let definition =
        CrawlerDefinition::new(site_config("hollys", "https://cafe.test/menu?page=1"), selectors)
            .with_pagination(PaginationKind::NextButton);

    let products = crawler(definition, site, TestModeConfig::disabled())
        .run()
        .await
        .unwrap();

    let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Page One", "Page Two"]);
    assert_eq!(products[1].external_url, "https://cafe.test/menu?page=2");
}

#[tokio::test]
async fn page_number_pagination_visits_listed_pages() {
    let pager = r#"<div class="pager"><a href="/list?p=1">1</a><a href="/list?p=2">2</a></div>"#;
    let site = StaticSite::new()
        .with_page(
            "https://cafe.test/list?p=1",
            format!(r#"<ul><li class="item"><span class="title">First</span></li></ul>{pager}"#),
        )
        .with_page(
            "https://cafe.test/list?p=2",
            format!(r#"<ul><li class="item"><span class="title">Second</span></li></ul>{pager}"#),
        );
    let mut selectors = item_selectors();
    selectors.pagination.page_numbers = Some(".pager a".to_string());
    let definition =
        CrawlerDefinition::new(site_config("compose", "https://cafe.test/list?p=1"), selectors)
            .with_pagination(PaginationKind::PageNumbers);

    let products = crawler(definition, site, TestModeConfig::disabled())
        .run()
        .await
        .unwrap();

    assert_eq!(products.len(), 2);
    assert_eq!(products[1].name, "Second");
}

#[tokio::test]
async fn unreachable_extra_page_keeps_earlier_records_once() {
    let site = StaticSite::new().with_page(
        "https://cafe.test/list?p=1",
        r#"<ul><li class="item"><span class="title">First</span></li></ul>
           <div class="pager"><a href="/list?p=2">2</a></div>"#,
    );
    let mut selectors = item_selectors();
    selectors.pagination.page_numbers = Some(".pager a".to_string());
    let definition =
        CrawlerDefinition::new(site_config("compose", "https://cafe.test/list?p=1"), selectors)
            .with_pagination(PaginationKind::PageNumbers);

    let report = crawler(definition, site, TestModeConfig::disabled())
        .run_with_stats()
        .await
        .unwrap();

    let names: Vec<_> = report.products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["First"]);
    assert_eq!(report.stats.requests_handled, 1);
}

fn list_detail_site() -> StaticSite {
    StaticSite::new()
        .with_page(
            "https://cafe.test/",
            r#"<nav><a class="cat" href="/menu/coffee">Coffee</a></nav>"#,
        )
        .with_page(
            "https://cafe.test/menu/coffee",
            r#"<ul>
                 <li class="item" data-id="11"><span class="title">Cold Brew</span>
                     <img src="/thumb/11.png"></li>
                 <li class="item"><a onclick="goDetail('12')"><span class="title">Flat White</span></a>
                     <img src="/thumb/12.png"></li>
                 <li class="item"><span class="title">Seasonal</span></li>
               </ul>"#,
        )
        .with_page(
            "https://cafe.test/detail?id=11",
            r#"<div class="desc">Steeped for 12 hours</div><p class="price">5,000원</p>
               <table class="nutrition"><tr><td>kcal</td><td>15</td></tr></table>"#,
        )
        .with_page(
            "https://cafe.test/detail?id=12",
            r#"<div class="desc">Ristretto and milk</div><img class="hero" src="/hero/12.png">"#,
        )
}

fn list_detail_definition() -> CrawlerDefinition {
    let mut selectors = item_selectors();
    selectors.category_links = Some("a.cat".to_string());
    selectors.nutrition = Some("table.nutrition".to_string());
    selectors.detail = Some(DetailSelectors {
        description: Some(".desc".to_string()),
        price: Some(".price".to_string()),
        image: Some("img.hero".to_string()),
    });

    let mut site = site_config("twosome", "https://cafe.test/");
    site.detail_url_template = Some("/detail?id={id}".to_string());

    CrawlerDefinition::new(site, selectors)
        .with_strategy(CrawlStrategyKind::ListDetail)
        .with_nutrition_extractor(|table, _ctx| async move {
            let cells = table.select("td").await?;
            let mut calories = None;
            if let [label, value] = cells.as_slice() {
                if label.text().await?.as_deref() == Some("kcal") {
                    calories = value.text().await?.and_then(|v| v.trim().parse().ok());
                }
            }
            Ok::<_, anyhow::Error>(calories.map(|calories| NutritionInfo {
                calories: Some(calories),
                ..NutritionInfo::default()
            }))
        })
}

#[tokio::test]
async fn list_detail_merges_listing_and_detail_fields() {
    let report = crawler(
        list_detail_definition(),
        list_detail_site(),
        TestModeConfig::disabled(),
    )
    .run_with_stats()
    .await
    .unwrap();

    // The container without a detail page is pushed first, during phase 1
    let names: Vec<_> = report.products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Seasonal", "Cold Brew", "Flat White"]);
    assert_eq!(report.stats.detail_requests, 2);

    let cold_brew = &report.products[1];
    assert_eq!(cold_brew.description.as_deref(), Some("Steeped for 12 hours"));
    assert_eq!(cold_brew.price, Some(5000.0));
    assert_eq!(cold_brew.image_url, "https://cafe.test/thumb/11.png");
    assert_eq!(cold_brew.external_url, "https://cafe.test/detail?id=11");
    assert_eq!(cold_brew.external_id, "twosome_coffee_cold-brew");
    assert_eq!(cold_brew.nutrition.as_ref().and_then(|n| n.calories), Some(15.0));

    let flat_white = &report.products[2];
    assert_eq!(flat_white.image_url, "https://cafe.test/hero/12.png");
    assert!(flat_white.nutrition.is_none());
    assert!(flat_white.price.is_none());
}

#[tokio::test]
async fn bad_detail_link_skips_only_its_item() {
    let site = StaticSite::new()
        .with_page(
            "https://cafe.test/menu",
            r#"<ul>
                 <li class="item"><a class="more" href="/detail/1"><span class="title">Cold Brew</span></a></li>
                 <li class="item"><a class="more" href="http://"><span class="title">Broken</span></a></li>
                 <li class="item"><a class="more" href="/detail/3"><span class="title">Flat White</span></a></li>
               </ul>"#,
        )
        .with_page("https://cafe.test/detail/1", r#"<p class="desc">Slow</p>"#)
        .with_page("https://cafe.test/detail/3", r#"<p class="desc">Silky</p>"#);

    let mut selectors = item_selectors();
    selectors.detail_link = Some("a.more".to_string());
    selectors.detail = Some(DetailSelectors {
        description: Some(".desc".to_string()),
        ..DetailSelectors::default()
    });
    let definition = CrawlerDefinition::new(site_config("tom", "https://cafe.test/menu"), selectors)
        .with_strategy(CrawlStrategyKind::ListDetail);

    let report = crawler(definition, site, TestModeConfig::disabled())
        .run_with_stats()
        .await
        .unwrap();

    let names: Vec<_> = report.products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Cold Brew", "Flat White"]);
    assert_eq!(report.products[1].description.as_deref(), Some("Silky"));
    assert_eq!(report.stats.detail_requests, 2);
    assert_eq!(report.stats.items_skipped, 1);
    // main page plus two detail pages, none of them retried
    assert_eq!(report.stats.requests_handled, 3);
}

#[tokio::test]
async fn inline_crawler_over_list_detail_definition_stays_inline() {
    let site = StaticSite::new().with_page(
        "https://cafe.test/menu",
        r#"<ul><li class="item" data-id="7"><span class="title">Dolce Latte</span></li></ul>"#,
    );
    let mut definition = CrawlerDefinition::new(site_config("star", "https://cafe.test/menu"), item_selectors())
        .with_strategy(CrawlStrategyKind::ListDetail);
    definition.site.detail_url_template = Some("/detail?id={id}".to_string());

    let crawler = Crawler::inline_data(definition, Arc::new(StaticSiteDriver::new(Arc::new(site))))
        .with_test_mode(TestModeConfig::disabled());
    assert_eq!(crawler.strategy().kind(), CrawlStrategyKind::InlineData);
    assert!(!crawler.strategy().accepts(crawler.definition().strategy));

    let report = crawler.run_with_stats().await.unwrap();
    assert_eq!(report.products.len(), 1);
    assert_eq!(report.products[0].external_url, "https://cafe.test/menu");
    assert_eq!(report.stats.detail_requests, 0);
}

#[tokio::test]
async fn engine_config_supplies_options_a_definition_lacks() {
    let config = EngineConfig {
        crawler: CrawlerOptions {
            max_retries: 0,
            settle_delay_ms: 0,
            ..CrawlerOptions::default()
        },
        ..EngineConfig::default()
    };

    let site = Arc::new(StaticSite::new().with_page(
        "https://cafe.test/menu",
        r#"<ul><li class="item"><span class="title">Tea</span></li></ul><button class="more">More</button>"#,
    ));
    let mut selectors = item_selectors();
    selectors.pagination.load_more = Some("button.more".to_string());
    let definition = CrawlerDefinition::new(site_config("paik", "https://cafe.test/menu"), selectors)
        .with_pagination(PaginationKind::LoadMore);

    let crawler = Crawler::new(definition.clone(), Arc::new(StaticSiteDriver::new(Arc::clone(&site))))
        .with_engine_config(&config)
        .with_test_mode(TestModeConfig::disabled());
    assert_eq!(crawler.options(), config.crawler);
    assert_eq!(crawler.run().await.unwrap().len(), 1);
    assert_eq!(site.click_count(), 20);

    let own = CrawlerOptions {
        max_retries: 5,
        ..CrawlerOptions::default()
    };
    let crawler = Crawler::new(
        definition.with_options(own.clone()),
        Arc::new(StaticSiteDriver::new(site)),
    )
    .with_engine_config(&config)
    .with_test_mode(TestModeConfig::disabled());
    assert_eq!(crawler.options(), own);
}

#[tokio::test]
async fn request_ceiling_cuts_list_detail_short() {
    let products = crawler(
        list_detail_definition(),
        list_detail_site(),
        TestModeConfig::enabled(5, 3),
    )
    .run()
    .await
    .unwrap();

    // main + category + one detail page
    assert_eq!(products.len(), 2);
    assert_eq!(products[1].name, "Cold Brew");
}

#[tokio::test]
async fn custom_request_handler_replaces_routing() {
    let definition = CrawlerDefinition::new(site_config("custom", "https://cafe.test/menu"), item_selectors())
        .with_request_handler(|page, request, session| async move {
            let count = page.select("li").await?.len();
            session
                .push_record(brand_crawler::Product {
                    name: format!("{count} entries"),
                    name_en: None,
                    description: None,
                    price: None,
                    image_url: String::new(),
                    category: brand_crawler::ProductCategory::Other,
                    external_category: String::new(),
                    external_id: format!("custom_{}", request.url),
                    external_url: request.url,
                    nutrition: None,
                })
                .await?;
            Ok::<_, anyhow::Error>(())
        });
    let site = StaticSite::new().with_page("https://cafe.test/menu", "<ul><li>a</li><li>b</li></ul>");

    let products = crawler(definition, site, TestModeConfig::disabled()).run().await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "2 entries");
}

fn registry_with_failing_brand() -> Registry {
    let mut registry = Registry::new();
    for brand in ["alpha", "broken", "gamma"] {
        registry.register(brand, move || {
            let start_url = if brand == "broken" { "not a url" } else { "https://cafe.test/menu" };
            let site = StaticSite::new().with_page(
                "https://cafe.test/menu",
                r#"<ul><li class="item"><span class="title">Espresso</span></li></ul>"#,
            );
            crawler(
                CrawlerDefinition::new(site_config(brand, start_url), item_selectors()),
                site,
                TestModeConfig::disabled(),
            )
        });
    }
    registry
}

#[tokio::test]
async fn run_all_sequential_isolates_failing_brand() {
    let results = registry_with_failing_brand()
        .run_all(RunAllOptions::sequential())
        .await;

    assert_eq!(results.len(), 3);
    let succeeded: Vec<_> = results
        .iter()
        .filter(|r| r.is_success())
        .map(|r| r.brand.as_str())
        .collect();
    assert_eq!(succeeded, vec!["alpha", "gamma"]);

    let broken = &results[1];
    assert!(matches!(broken.outcome, Err(CrawlError::Driver { .. })));
    assert!(broken.products().is_empty());
    assert_eq!(results[2].products()[0].external_id, "gamma_espresso");
}

#[tokio::test]
async fn run_all_concurrent_collects_every_outcome() {
    let results = registry_with_failing_brand()
        .run_all(RunAllOptions::concurrent())
        .await;

    assert_eq!(results.iter().filter(|r| r.is_success()).count(), 2);
    assert_eq!(results.iter().filter(|r| !r.is_success()).count(), 1);
}

#[tokio::test]
async fn empty_start_url_is_rejected() {
    let definition = CrawlerDefinition::new(site_config("blank", " "), item_selectors());
    let err = crawler(definition, StaticSite::new(), TestModeConfig::disabled())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, CrawlError::InvalidDefinition { .. }));
    assert_eq!(err.brand(), "blank");
}
