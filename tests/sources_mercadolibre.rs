// tests/sources_mercadolibre.rs
// Fixture-driven extraction: real-ish result-page markup, no network.

use carscan::sources::MercadoLibreAdapter;
use carscan::{Currency, Source, SourceAdapter};
use chrono::{Days, Utc};

const FIXTURE: &str = r#"
<html><body><ol>
<li class="ui-search-layout__item">
  <a href="/MLA-1401-toyota-corolla" class="ui-search-link"></a>
  <img src="https://http2.mlstatic.com/D_NQ_NP_car1.jpg" alt="Toyota Corolla XEI 2.0">
  <span class="andes-money-amount">
    <span class="andes-money-amount__currency-symbol">$</span>
    <span class="andes-money-amount__fraction">12.500.000</span>
  </span>
  <span class="poly-component__location">Palermo, Capital Federal</span>
  <ul class="poly-attributes_list"><li>2020</li><li>65.000 Km</li></ul>
  <span>Publicado hace 3 días</span>
</li>
<li class="ui-search-layout__item">
  <a href="https://auto.mercadolibre.com.ar/MLA-222-vw-vento"></a>
  <img data-src="https://http2.mlstatic.com/D_NQ_NP_car2.jpg" alt="Volkswagen Vento 1.4 TSI">
  <span class="andes-money-amount">
    <span class="andes-money-amount__currency-symbol">US$</span>
    <span class="andes-money-amount__fraction">18.500</span>
  </span>
  <span class="ui-search-item__location">Rosario, Santa Fe</span>
  <ul class="ui-search-item__attributes"><li>2019</li><li>80.000 km</li></ul>
</li>
<li class="ui-search-layout__item">
  <img src="https://http2.mlstatic.com/D_NQ_NP_car3.jpg" alt="Peugeot 208 sin link">
  <span class="andes-money-amount">
    <span class="andes-money-amount__fraction">9.000.000</span>
  </span>
</li>
<li class="ui-search-layout__item">
  <a href="/MLA-444-fiat-cronos"></a>
  <img src="data:image/gif;base64,R0lGOD" alt="Fiat Cronos Drive">
  <span class="andes-money-amount">
    <span class="andes-money-amount__currency-symbol">$</span>
    <span class="andes-money-amount__fraction">Consultar</span>
  </span>
</li>
</ol></body></html>
"#;

#[tokio::test]
async fn extracts_cards_with_per_item_currency() {
    let adapter = MercadoLibreAdapter::from_fixture(FIXTURE);
    let listings = adapter.search("toyota corolla", 48).await.unwrap();

    // the card without a link is dropped, everything else is kept
    assert_eq!(listings.len(), 3);

    let corolla = &listings[0];
    assert_eq!(corolla.source, Source::MercadoLibre);
    assert_eq!(corolla.title, "Toyota Corolla XEI 2.0");
    assert_eq!(
        corolla.link,
        "https://www.mercadolibre.com.ar/MLA-1401-toyota-corolla"
    );
    assert_eq!(corolla.native_price, 12_500_000);
    assert_eq!(corolla.currency, Currency::Ars);
    assert_eq!(corolla.location.as_deref(), Some("Palermo, Capital Federal"));
    assert_eq!(corolla.year, Some(2020));
    assert_eq!(corolla.km, Some(65_000));
    assert_eq!(
        corolla.published,
        Some(Utc::now().date_naive() - Days::new(3))
    );
    assert_eq!(
        corolla.image.as_deref(),
        Some("https://http2.mlstatic.com/D_NQ_NP_car1.jpg")
    );

    let vento = &listings[1];
    assert_eq!(vento.currency, Currency::Usd);
    assert_eq!(vento.native_price, 18_500);
    assert_eq!(vento.link, "https://auto.mercadolibre.com.ar/MLA-222-vw-vento");
    assert_eq!(vento.location.as_deref(), Some("Rosario, Santa Fe"));
    assert_eq!(vento.year, Some(2019));
    assert_eq!(vento.km, Some(80_000));
    // no src attribute: the lazy-load data-src is picked up
    assert_eq!(
        vento.image.as_deref(),
        Some("https://http2.mlstatic.com/D_NQ_NP_car2.jpg")
    );
    assert_eq!(vento.published, None);
}

#[tokio::test]
async fn malformed_price_is_flagged_zero_not_dropped() {
    let adapter = MercadoLibreAdapter::from_fixture(FIXTURE);
    let listings = adapter.search("fiat cronos", 48).await.unwrap();

    let cronos = listings
        .iter()
        .find(|l| l.title == "Fiat Cronos Drive")
        .expect("unparseable price must not drop the record");
    assert_eq!(cronos.native_price, 0);
    // ambiguous markup falls back to the source's native currency
    assert_eq!(cronos.currency, Currency::Ars);
    // data-URI thumbnail counts as no image
    assert_eq!(cronos.image, None);
}

#[tokio::test]
async fn limit_truncates_in_ranking_order() {
    let adapter = MercadoLibreAdapter::from_fixture(FIXTURE);
    let listings = adapter.search("toyota corolla", 2).await.unwrap();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].title, "Toyota Corolla XEI 2.0");
}
