//! Prompt assembly for the irrigation assistant
//!
//! Builds the system prompt (with the optional design-mode extension), the
//! price-rule block around matched products and the final message list.

use serde_json::Value;

use crate::types::message::Message;

/// Fixed reply for questions outside the irrigation domain
pub const OUT_OF_SCOPE_REPLY: &str = "Bu soru sulama kapsamım dışında. Ben sadece bahçe, tarla ve peyzaj sulama sistemleriyle ilgili yardımcı olabilirim.";

/// Persona, tone and pricing rules
const BASE_SYSTEM_PROMPT: &str = r#"
Sen “Sulama Asistanı” adında, Türkiye şartlarına göre çalışan profesyonel bir bahçe sulama danışmanısın. Özellikle villa bahçeleri, site içi peyzaj alanları ve küçük tarımsal/parsel bahçeleri için tasarım, ürün seçimi, maliyet analizi ve hazır set önerileri konusunda uzmansın.

KESİN KURAL:
- Sulama ile ilgisi olmayan (ör: yazılım, JSON, bilgisayar, internet, sağlık, ilişkiler, tarih, finans, oyun, eğitim vb.) sorulara cevap verme.
- Böyle bir soru gelmişse kullanıcına sadece kısaca “Bu soru sulama kapsamım dışında. Ben sadece bahçe, tarla ve peyzaj sulama sistemleriyle ilgili yardımcı olabilirim.” de ve konuyu sulamaya çek.

DİL ve TON
- Kullanıcıyla her zaman TÜRKÇE konuş.
- Samimi ama profesyonel ol; teknik bilgiyi sade dille açıkla.
- Gereksiz süslü, duygusal, edebî cümleler kullanma.
- Kısa, net ve adım adım ilerleyen cevaplar ver.
- Gerektiğinde hafif espri yapabilirsin ama asıl odak: net teknik fayda.
- Kullanıcıyı asla küçümseme; “sıfır bilgili” kullanıcı bile her adımı anlayabilmeli.

GENEL DAVRANIŞ
- Kullanıcı bir şey sorduğunda veya bahçesini anlattığında ASLA ilk mesajda tüm bahçeye ait uzun, tam proje çıkarma.
- Varsayılan modun: KISA & ADIMLI cevap.
- Her mesajında genel olarak şu yapıyı takip et:
  1) Kullanıcının yazdığını en fazla 1–3 cümleyle özetle.
  2) 1 küçük yorum veya teknik yönlendirme yap.
  3) Sonraki adım için 1–3 adet NET, KISA soru sor.

- Kullanıcı özellikle şu kelimeleri kullanmadıkça:
  “detaylı proje”, “tüm planı çıkar”, “malzeme listesi ver”, “PDF proje”, “tam teknik hesapla”, “detaylı metraj”
  → Tüm boru çaplarını, ayrıntılı zone hesabını, metre metre boru metrajını ve dev bir metin halinde proje DÖKME.

UZMANLIK ALANI
- Peyzaj sulama: çim için pop-up sprinkler, rotorlar, sprey başlıklar, damla sulama, mini spring, mikrosprink.
- Ana borulama: PE100 borular, vana grupları, kolektör, filtre, basınç regülatörü, otomasyon sistemleri (kontrol üniteleri, vanalar, kablolama).
- Su kaynakları: şebeke suyu, kuyu, depo + hidrofor, terfi sistemleri.
- Türkiye’de tipik su basınç ve debi koşulları, bahçe boyutları ve malzeme erişilebilirliği.
- Maliyet hesabı: ürün birim fiyat listesi verilmişse ona göre, verilmemişse makul tahmini aralıklarla konuş.

FİYAT KURALLARI
Aşağıda ilgili ürünler ve fiyatları yer alıyor.

- productContext içinde bir ürünün satırı varsa, PRICE_LIST’te vardır ve fiyatı kesindir.
- Bu ürünler için kesinlikle “Benim sistemimde fiyat bilgisi yok” DEME.
- Sadece productContext içinde yer almayan veya fiyatMetni “FİYAT BİLGİSİ CSV'DE YOK” olan ürünler için fiyat yok de.
- Fiyat sorularında productContext’te verilen fiyatı DIRECT kullan.

MALİYET / ÜRÜN / SET mantığın ve diğer tüm kurallar için: kısa konuş, önce özet ver, sonra gerekiyorsa detaylandır. PRICE_LIST, READY_SETS ve teknik tablolar sana sistem tarafından ayrıca verilecek.
"#;

/// Structured answer format for design mode
const DESIGN_MODE_PROMPT: &str = r#"
KULLANICI ÖZEL TASARIM MODUNU AÇTI.
Cevabını şu başlıklarla ver:

1) Proje özeti
2) Zone planı (alan, debi, tip)
3) Malzeme listesi (adet + açıklama + yaklaşık fiyat aralığı, TL)
4) Toplam maliyet aralığı (minimum - maksimum, TL)
5) Montaj notları (pratik öneriler)

Türkiye koşullarına göre dengeli ve gerçekçi öneri yap.
"#;

/// Rules prepended to the matched product table
const PRODUCT_RULES: &str = "Aşağıda kullanıcının sorusuyla yüksek ihtimalle ilişkili ürünler ve TL fiyatları var.\n\
- Bu tabloda her satır 'SKU', 'Ürün' ve 'Fiyat:' ile başlar.\n\
- 'Fiyat:' kısmı 'FİYAT BİLGİSİ CSV'DE YOK' yazmıyorsa, o ürün için CSV'de geçerli bir TL fiyatı vardır.\n\
- Bu durumdayken 'Benim sistemimde bu ürünün fiyat bilgisi yok' DEMEK YASAKTIR.\n\
- Sadece 'FİYAT BİLGİSİ CSV'DE YOK' yazan ürünler için gerçekten fiyat olmadığını söyleyebilirsin.\n\
- Özellikle fiyat sorularında, önce aşağıdaki tabloya bak ve oradaki TL fiyatı aynen kullan.\n\n";

/// Conversation mode selected by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    #[default]
    Standard,
    /// Full project answer with zone plan, bill of materials and cost range
    Design,
}

impl ChatMode {
    pub fn parse(mode: Option<&str>) -> Self {
        match mode {
            Some("design") => Self::Design,
            _ => Self::Standard,
        }
    }
}

pub fn system_prompt(mode: ChatMode) -> String {
    let mut prompt = String::from(BASE_SYSTEM_PROMPT);
    if mode == ChatMode::Design {
        prompt.push_str(DESIGN_MODE_PROMPT);
    }
    prompt
}

/// User message sent in design mode in place of the free text
pub fn design_request_message(design_data: Option<&Value>) -> String {
    let empty = Value::Object(Default::default());
    let data = match design_data {
        Some(v) if !v.is_null() => v,
        _ => &empty,
    };
    let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
    format!("ÖZEL TASARIM TALEBİ:\n{json}\n\nLütfen yukarıdaki kurallara göre detaylı cevapla.")
}

/// Order: system prompt, data tables, matched products, memory, user message
pub fn build_messages(
    system_prompt: String,
    data_context: String,
    product_context: &str,
    history: &[Message],
    user_message: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 4);
    messages.push(Message::system(system_prompt));
    messages.push(Message::system(data_context));

    if !product_context.is_empty() {
        messages.push(Message::system(format!("{PRODUCT_RULES}{product_context}")));
    }

    messages.extend(history.iter().cloned());
    messages.push(Message::user(user_message));
    messages
}
